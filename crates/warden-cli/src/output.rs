//! Output formats for command results.

use std::collections::BTreeSet;

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;
use warden_auth::CapabilityReport;

use crate::theme::Theme;

/// How command results are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Colored text for humans.
    #[default]
    Pretty,
    /// One JSON document per command on stdout.
    Json,
}

/// Result of a capability check.
#[derive(Debug, Serialize)]
pub(crate) struct CheckOutcome<'a> {
    pub(crate) identity: Option<&'a str>,
    pub(crate) capability: &'a str,
    pub(crate) granted: bool,
}

impl OutputFormat {
    pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Print a management or listing report.
    pub(crate) fn report(self, report: &CapabilityReport) -> Result<()> {
        match self {
            Self::Json => Self::print_json(report),
            Self::Pretty => {
                println!("{}", Theme::header(report.email.as_str()));
                print_names(&report.capabilities);
                Ok(())
            },
        }
    }

    /// Print the outcome of a check.
    pub(crate) fn check(self, outcome: &CheckOutcome<'_>) -> Result<()> {
        match self {
            Self::Json => Self::print_json(outcome),
            Self::Pretty => {
                let who = outcome.identity.unwrap_or("guest");
                let cap = Theme::capability(outcome.capability);
                if outcome.granted {
                    println!("{}", Theme::success(&format!("{who} holds {cap}")));
                } else {
                    println!("{}", Theme::error(&format!("{who} does not hold {cap}")));
                }
                Ok(())
            },
        }
    }
}

fn print_names(names: &BTreeSet<String>) {
    if names.is_empty() {
        println!("  {}", Theme::dimmed("(no capabilities)"));
    }
    for name in names {
        println!("  {}", Theme::capability(name));
    }
}
