//! Company directory used as shared reference data during rendering.
//!
//! The pool is loaded once by the supervisor before any worker starts and
//! handed to every job behind an `Arc`. It is never mutated afterwards,
//! so workers share it without locking.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading a [`CompanyPool`].
#[derive(Debug, Error)]
pub enum PoolError {
    /// Directory file could not be read.
    #[error("could not read company directory {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Directory file is not valid TOML.
    #[error("invalid company directory {path}: {source}")]
    Format {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A company entry carries a RUT with no numeric stem.
    #[error("company entry has invalid RUT: {0}")]
    InvalidRut(String),
}

/// One company record.
#[derive(Debug, Clone, Deserialize)]
pub struct Company {
    /// Full RUT including check digit, e.g. `76543210-K`.
    pub rut: String,
    /// Legal name.
    pub name: String,
    /// Declared line of business.
    #[serde(default)]
    pub activity: Option<String>,
    /// Street address.
    #[serde(default)]
    pub address: Option<String>,
    /// Commune.
    #[serde(default)]
    pub commune: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PoolFile {
    #[serde(default)]
    company: Vec<Company>,
}

/// Read-only directory of companies, keyed by the numeric RUT stem.
#[derive(Debug, Clone, Default)]
pub struct CompanyPool {
    companies: HashMap<u64, Company>,
}

impl CompanyPool {
    /// Loads a pool from a TOML file of `[[company]]` tables.
    pub fn from_file(path: &Path) -> Result<Self, PoolError> {
        let text = std::fs::read_to_string(path).map_err(|source| PoolError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: PoolFile = toml::from_str(&text).map_err(|source| PoolError::Format {
            path: path.to_path_buf(),
            source,
        })?;

        let mut companies = HashMap::with_capacity(file.company.len());
        for company in file.company {
            let stem = company.rut.split('-').next().unwrap_or_default();
            let key = stem
                .parse::<u64>()
                .map_err(|_| PoolError::InvalidRut(company.rut.clone()))?;
            companies.insert(key, company);
        }

        Ok(Self { companies })
    }

    /// Looks up a company by the numeric stem of its RUT.
    pub fn get(&self, rut_stem: u64) -> Option<&Company> {
        self.companies.get(&rut_stem)
    }

    /// Number of companies in the pool.
    pub fn len(&self) -> usize {
        self.companies.len()
    }

    /// True when the pool holds no companies.
    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }
}
