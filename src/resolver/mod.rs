// Resolver module: turns dynamically keyed response entries into overlays.

pub mod palette;
pub mod series_resolver;

pub use series_resolver::SeriesResolver;
