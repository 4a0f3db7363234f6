//! Lending configuration loaded via OrthoConfig.
//!
//! Values come from `LIBRARY_*` environment variables, an optional
//! configuration file, or command-line flags, in OrthoConfig's usual order of
//! precedence. Every numeric knob must be positive.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::{
    CatalogueConfig, LoanEngineConfig, LoanPeriod, ReconciliationConfig, StoreDeadline,
};

/// Raw settings for the lending services.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "LIBRARY")]
pub struct LibrarySettings {
    /// Days between borrowing and the due date.
    #[ortho_config(default = 14)]
    pub loan_period_days: u32,
    /// Upper bound for each store call, in milliseconds.
    #[ortho_config(default = 5000)]
    pub store_timeout_ms: u64,
    /// Rows per page in the admin catalogue listing.
    #[ortho_config(default = 5)]
    pub catalogue_page_size: usize,
    /// Books fetched per round-trip when streaming available books.
    #[ortho_config(default = 50)]
    pub listing_batch_size: usize,
    /// Seconds between background reconciliation passes.
    #[ortho_config(default = 300)]
    pub reconcile_interval_secs: u64,
    /// Seconds a pending intent is left alone before it is reconciled.
    #[ortho_config(default = 60)]
    pub reconcile_grace_secs: u64,
    /// Repair a book immediately after a partial borrow or return failure.
    /// Unset means enabled.
    pub reconcile_on_partial_failure: Option<bool>,
}

/// A setting that cannot drive the services.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },
    #[error("{field} must be at most {max}")]
    TooLarge { field: &'static str, max: usize },
}

fn at_most(field: &'static str, value: usize, max: usize) -> Result<usize, SettingsError> {
    if value > max {
        Err(SettingsError::TooLarge { field, max })
    } else {
        Ok(value)
    }
}

fn positive<T>(field: &'static str, value: T) -> Result<T, SettingsError>
where
    T: PartialEq + Default,
{
    if value == T::default() {
        Err(SettingsError::NotPositive { field })
    } else {
        Ok(value)
    }
}

impl LibrarySettings {
    /// Reject zero-valued knobs and oversized pages before any service is
    /// built.
    pub fn validate(&self) -> Result<(), SettingsError> {
        positive("loan_period_days", self.loan_period_days)?;
        positive("store_timeout_ms", self.store_timeout_ms)?;
        positive("catalogue_page_size", self.catalogue_page_size)?;
        at_most(
            "catalogue_page_size",
            self.catalogue_page_size,
            pagination::MAX_PAGE_SIZE,
        )?;
        positive("listing_batch_size", self.listing_batch_size)?;
        positive("reconcile_interval_secs", self.reconcile_interval_secs)?;
        Ok(())
    }

    pub fn store_deadline(&self) -> StoreDeadline {
        StoreDeadline::new(Duration::from_millis(self.store_timeout_ms))
    }

    /// Engine tuning derived from these settings.
    pub fn loan_engine(&self) -> Result<LoanEngineConfig, SettingsError> {
        self.validate()?;
        let loan_period = LoanPeriod::from_days(self.loan_period_days).map_err(|_| {
            SettingsError::NotPositive {
                field: "loan_period_days",
            }
        })?;
        Ok(LoanEngineConfig {
            loan_period,
            store_deadline: self.store_deadline(),
            listing_batch_size: self.listing_batch_size,
            reconcile_on_partial_failure: self.reconcile_on_partial_failure.unwrap_or(true),
        })
    }

    pub fn catalogue(&self) -> Result<CatalogueConfig, SettingsError> {
        self.validate()?;
        Ok(CatalogueConfig {
            page_size: self.catalogue_page_size,
            store_deadline: self.store_deadline(),
        })
    }

    /// Reconciler tuning; sweeps page through the catalogue in listing-sized
    /// batches.
    pub fn reconciliation(&self) -> Result<ReconciliationConfig, SettingsError> {
        self.validate()?;
        Ok(ReconciliationConfig {
            interval: Duration::from_secs(self.reconcile_interval_secs),
            grace: Duration::from_secs(self.reconcile_grace_secs),
            batch_size: self.listing_batch_size,
            store_deadline: self.store_deadline(),
        })
    }
}
