//! `arbot strategies`: list the detectors this build knows how to run.

use tabled::{Table, Tabled};

#[derive(Tabled)]
struct StrategyRow {
    #[tabled(rename = "Name")]
    name: &'static str,
    #[tabled(rename = "Signal")]
    signal: &'static str,
    #[tabled(rename = "Config section")]
    config: &'static str,
}

/// Print the table of built-in detectors. Doesn't need a running instance or
/// config file, unlike every other subcommand.
pub fn list() {
    let rows = vec![
        StrategyRow {
            name: "spatial",
            signal: "same symbol, bid on one exchange above ask on another",
            config: "[detector.spatial]",
        },
        StrategyRow {
            name: "triangular",
            signal: "a closed path of trades across pairs returns more than it started with",
            config: "[detector.triangular]",
        },
    ];

    println!("{}", Table::new(rows));
}
