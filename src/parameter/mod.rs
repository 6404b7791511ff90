//! Control index -> parameter indirection
//!
//! Bindings never hold host parameters directly. They ask a
//! [`ParameterProvider`] for the parameter behind control `index` each time
//! they need it, so a bank page change or a host collection change is picked
//! up without re-wiring the bindings. Indices with nothing behind them return
//! [`NoParameter`].

mod bank;

pub use bank::{BankListener, ParameterBank};

use crate::host::{Parameter, ParameterRef};
use std::sync::Arc;

/// "Nothing bound here" sentinel
#[derive(Debug, Clone, Copy, Default)]
pub struct NoParameter;

impl Parameter for NoParameter {
    fn exists(&self) -> bool {
        false
    }

    fn name(&self) -> String {
        String::new()
    }

    fn value(&self) -> f64 {
        0.0
    }

    fn display_value(&self) -> String {
        String::new()
    }

    fn set_value(&self, _value: f64) {}

    fn change_value(&self, _delta: f64) {}

    fn reset_value(&self) {}

    fn touch(&self, _touched: bool) {}
}

pub fn no_parameter() -> ParameterRef {
    Arc::new(NoParameter)
}

pub trait ParameterProvider: Send + Sync {
    /// Number of controls this provider serves
    fn size(&self) -> usize;

    /// Parameter for control `index`; the sentinel when unbound
    fn get(&self, index: usize) -> ParameterRef;
}

pub type ProviderRef = Arc<dyn ParameterProvider>;

/// Constant list of parameters
pub struct FixedParameterProvider {
    params: Vec<ParameterRef>,
}

impl FixedParameterProvider {
    pub fn new(params: Vec<ParameterRef>) -> Self {
        Self { params }
    }
}

impl ParameterProvider for FixedParameterProvider {
    fn size(&self) -> usize {
        self.params.len()
    }

    fn get(&self, index: usize) -> ParameterRef {
        self.params.get(index).cloned().unwrap_or_else(no_parameter)
    }
}

/// Window into a larger provider
///
/// Chained units (e.g. an extender next to the main surface) each see their
/// own slice of one bank.
pub struct RangeFilterProvider {
    inner: ProviderRef,
    offset: usize,
    size: usize,
}

impl RangeFilterProvider {
    pub fn new(inner: ProviderRef, offset: usize, size: usize) -> Self {
        Self { inner, offset, size }
    }
}

impl ParameterProvider for RangeFilterProvider {
    fn size(&self) -> usize {
        self.size
    }

    fn get(&self, index: usize) -> ParameterRef {
        if index >= self.size {
            return no_parameter();
        }
        self.inner.get(self.offset + index)
    }
}

/// Always sentinels, for banks that do not apply in the current context
pub struct EmptyParameterProvider {
    size: usize,
}

impl EmptyParameterProvider {
    pub fn new(size: usize) -> Self {
        Self { size }
    }
}

impl ParameterProvider for EmptyParameterProvider {
    fn size(&self) -> usize {
        self.size
    }

    fn get(&self, _index: usize) -> ParameterRef {
        no_parameter()
    }
}
