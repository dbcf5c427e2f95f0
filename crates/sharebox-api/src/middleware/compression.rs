//! Response compression layer.

use tower_http::compression::CompressionLayer;
use tower_http::compression::predicate::{DefaultPredicate, NotForContentType, Predicate};

/// Gzip for JSON responses. Zip archives are already deflated.
pub fn build_compression_layer() -> CompressionLayer<impl Predicate + Clone> {
    CompressionLayer::new().compress_when(
        DefaultPredicate::new().and(NotForContentType::const_new("application/zip")),
    )
}
