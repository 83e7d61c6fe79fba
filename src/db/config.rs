use crate::storage::trie::NODE_HEADER_BYTES;
use crate::types::{RadixError, Result};

pub use crate::storage::trie::AllocMode;

/// Per-transaction settings for node allocation and value layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TxOptions {
    /// How the transaction obtains node storage.
    pub alloc: AllocMode,
    /// Alignment of values and metadata inside a node, a power of two.
    pub value_align: Option<usize>,
    /// Zeroed metadata bytes reserved next to every newly written value.
    pub meta_size: usize,
}

impl TxOptions {
    /// Nodes carved from a fixed budget of `capacity` bytes that is
    /// reclaimed on commit or rollback.
    pub fn fixed_buffer(capacity: usize) -> Self {
        Self {
            alloc: AllocMode::Fixed { capacity },
            ..Self::default()
        }
    }

    /// Individually allocated nodes with live bytes capped at `limit`.
    pub fn limited(limit: usize) -> Self {
        Self {
            alloc: AllocMode::Dynamic { limit: Some(limit) },
            ..Self::default()
        }
    }

    /// Replaces the allocation strategy.
    pub fn with_alloc(mut self, alloc: AllocMode) -> Self {
        self.alloc = alloc;
        self
    }

    /// Aligns the start of every stored value to `align` bytes.
    pub fn with_value_align(mut self, align: usize) -> Self {
        self.value_align = Some(align);
        self
    }

    /// Reserves `meta_size` metadata bytes next to every value.
    pub fn with_meta_size(mut self, meta_size: usize) -> Self {
        self.meta_size = meta_size;
        self
    }

    /// Rejects settings no transaction could run with.
    pub fn validate(&self) -> Result<()> {
        if let Some(align) = self.value_align {
            if !align.is_power_of_two() {
                return Err(RadixError::Invalid("value alignment must be a power of two"));
            }
        }
        let budget = match self.alloc {
            AllocMode::Dynamic { limit } => limit,
            AllocMode::Fixed { capacity } => Some(capacity),
        };
        if budget.is_some_and(|bytes| bytes < NODE_HEADER_BYTES) {
            return Err(RadixError::Invalid("allocation budget smaller than a node header"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_and_setters() {
        let opts = TxOptions::fixed_buffer(1 << 16).with_value_align(8).with_meta_size(4);
        assert_eq!(opts.alloc, AllocMode::Fixed { capacity: 1 << 16 });
        assert_eq!(opts.value_align, Some(8));
        assert_eq!(opts.meta_size, 4);
        assert!(opts.validate().is_ok());
        assert_eq!(TxOptions::default().alloc, AllocMode::Dynamic { limit: None });
        let limited = TxOptions::default().with_alloc(AllocMode::Dynamic { limit: Some(4096) });
        assert_eq!(limited, TxOptions::limited(4096));
    }

    #[test]
    fn validate_rejects_bad_alignment_and_tiny_budgets() {
        assert!(TxOptions::default().with_value_align(12).validate().is_err());
        assert!(TxOptions::fixed_buffer(0).validate().is_err());
        assert!(TxOptions::limited(4).validate().is_err());
        assert!(TxOptions::limited(4096).validate().is_ok());
    }
}
