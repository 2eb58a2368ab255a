// Notifier module: user-visible feedback (alerts and busy indicator).

pub mod console;

pub use console::ConsoleNotifier;

/// Where the pipeline reports what the user must see.
pub trait Notifier {
    /// Shown while a fetch is in flight.
    fn busy(&self, on: bool);

    /// A fatal error for this cycle.
    fn alert(&self, message: &str);

    /// A non-fatal note, e.g. an overlay that could not be drawn.
    fn notice(&self, message: &str);
}
