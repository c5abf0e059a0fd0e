//! Config for reading input documents.

use std::num::NonZeroUsize;

/// CLI config for input sources.
#[derive(Debug, Clone, Copy, clap::Parser)]
pub struct SourceConfig {
    /// Number of bytes requested from an input per read.
    #[clap(
    long = "chunk-size",
    env = "INGESTD_CHUNK_SIZE",
    default_value = "8192", // 8 KiB
    action,
    )]
    pub chunk_size: NonZeroUsize,

    /// Maximum size of a single input document, in bytes. 0 disables the limit.
    #[clap(
    long = "max-document-bytes",
    env = "INGESTD_MAX_DOCUMENT_BYTES",
    default_value = "10485760", // 10 MiB
    action,
    )]
    pub max_document_bytes: usize,
}

impl SourceConfig {
    /// The accumulation limit, if any
    pub fn document_limit(&self) -> Option<usize> {
        (self.max_document_bytes > 0).then_some(self.max_document_bytes)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn defaults() {
        let config = SourceConfig::try_parse_from(["ingestd"]).unwrap();
        assert_eq!(config.chunk_size.get(), 8 * 1024);
        assert_eq!(config.document_limit(), Some(10 * 1024 * 1024));
    }

    #[test]
    fn zero_disables_limit() {
        let config =
            SourceConfig::try_parse_from(["ingestd", "--max-document-bytes", "0"]).unwrap();
        assert_eq!(config.document_limit(), None);
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        assert!(SourceConfig::try_parse_from(["ingestd", "--chunk-size", "0"]).is_err());
    }
}
