// Configuration management module
// This file handles loading engine settings from an optional config file
// layered under ROUTER__* environment variables
//
// Numan Thabit 2025 Nov

use alloy_primitives::{Address, U256};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Upper bound on accepted route buffers unless configured otherwise.
pub const DEFAULT_MAX_ROUTE_BYTES: usize = 64 * 1024;

/// How much of the engine's holdings an engine-balance step draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservePolicy {
    /// The whole balance. Callers that want a residual unit left behind
    /// arrange it themselves.
    #[default]
    DrawFull,
    /// Everything but one unit.
    KeepOneUnit,
}

impl ReservePolicy {
    pub fn drawable(&self, balance: U256) -> U256 {
        match self {
            ReservePolicy::DrawFull => balance,
            ReservePolicy::KeepOneUnit => balance.saturating_sub(U256::from(1u8)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Address the engine holds balances under and pulls allowances as.
    pub engine_address: Address,
    #[serde(default)]
    pub reserve_policy: ReservePolicy,
    #[serde(default = "default_max_route_bytes")]
    pub max_route_bytes: usize,
}

fn default_max_route_bytes() -> usize {
    DEFAULT_MAX_ROUTE_BYTES
}

impl EngineConfig {
    pub fn new(engine_address: Address) -> Self {
        Self {
            engine_address,
            reserve_policy: ReservePolicy::default(),
            max_route_bytes: DEFAULT_MAX_ROUTE_BYTES,
        }
    }

    pub fn with_reserve_policy(mut self, policy: ReservePolicy) -> Self {
        self.reserve_policy = policy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.engine_address == Address::ZERO {
            bail!("engine_address must not be the zero address");
        }
        if self.max_route_bytes == 0 {
            bail!("max_route_bytes must be positive");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub engine: EngineConfig,
    /// tracing filter directive, e.g. `info,ultra_router=debug`
    pub log_filter: Option<String>,
}

impl AppConfig {
    /// Reads `path` when given, then applies `ROUTER__*` overrides
    /// (`ROUTER__ENGINE__RESERVE_POLICY=keep_one_unit`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let cfg = builder
            .add_source(
                config::Environment::with_prefix("ROUTER")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .context("failed to assemble configuration")?;
        let app: AppConfig = cfg
            .try_deserialize()
            .context("invalid router configuration")?;
        app.engine.validate()?;
        Ok(app)
    }
}
