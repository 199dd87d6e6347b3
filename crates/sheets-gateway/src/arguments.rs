//! Command line arguments for the spreadsheet gateway. The process entry
//! point parses these once, validates them, and constructs a single
//! [`crate::client::SheetClient`] that is passed to all callers.

use {
    rate_limit::RateBudget,
    std::{
        fmt::{self, Display, Formatter},
        time::Duration,
    },
};

#[derive(clap::Parser)]
pub struct Arguments {
    /// Rate budget for read traffic in the form
    /// `<requests_per_second>[,<max_concurrent>]`. Read and write quotas are
    /// independent on the remote side.
    #[clap(long, env, default_value = "1")]
    pub sheets_read_budget: RateBudget,

    /// Rate budget for write traffic, same format as the read budget.
    #[clap(long, env, default_value = "1")]
    pub sheets_write_budget: RateBudget,

    /// How often a transiently failing remote call is retried after the
    /// initial attempt.
    #[clap(long, env, default_value = "3")]
    pub sheets_retry_attempts: u32,

    /// Pause between two retry attempts.
    #[clap(
        long,
        env,
        default_value = "2s",
        value_parser = humantime::parse_duration,
    )]
    pub sheets_retry_delay: Duration,

    /// Maximum number of data rows a tab may hold after a bounded append;
    /// the oldest rows are evicted to stay below it.
    #[clap(long, env, default_value = "10000")]
    pub sheets_row_limit: u32,

    /// Default timeout for http requests.
    #[clap(
        long,
        env,
        default_value = "10s",
        value_parser = humantime::parse_duration,
    )]
    pub http_timeout: Duration,
}

impl Display for Arguments {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let Self {
            sheets_read_budget,
            sheets_write_budget,
            sheets_retry_attempts,
            sheets_retry_delay,
            sheets_row_limit,
            http_timeout,
        } = self;

        writeln!(f, "sheets_read_budget: {:?}", sheets_read_budget)?;
        writeln!(f, "sheets_write_budget: {:?}", sheets_write_budget)?;
        writeln!(f, "sheets_retry_attempts: {}", sheets_retry_attempts)?;
        writeln!(f, "sheets_retry_delay: {:?}", sheets_retry_delay)?;
        writeln!(f, "sheets_row_limit: {}", sheets_row_limit)?;
        writeln!(f, "http_timeout: {:?}", http_timeout)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {super::*, clap::Parser};

    #[test]
    fn parses_defaults() {
        let args = Arguments::parse_from(["test"]);
        assert_eq!(args.sheets_read_budget, RateBudget::default());
        assert_eq!(args.sheets_retry_attempts, 3);
        assert_eq!(args.sheets_retry_delay, Duration::from_secs(2));
        assert_eq!(args.sheets_row_limit, 10_000);
    }

    #[test]
    fn parses_compound_budget() {
        let args = Arguments::parse_from(["test", "--sheets-write-budget", "0.8,2"]);
        assert_eq!(
            args.sheets_write_budget,
            RateBudget::new(0.8, Some(2)).unwrap()
        );
    }

    #[test]
    fn rejects_invalid_budget() {
        let result = Arguments::try_parse_from(["test", "--sheets-read-budget", "0"]);
        assert!(result.is_err());
    }
}
