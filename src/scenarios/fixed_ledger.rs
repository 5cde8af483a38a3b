/// Small control scenario: fixed bidders, balances kept by the auction.
///
/// 7 users, 5 bidders all bidding 1.0, 10 rounds, balances printed after every round.
///
/// Since every bidder bids the same, each round is a 5-way tie priced at the tied value 1.0, so
/// every win costs 1.0 and earns at most 1.0. It validates:
/// - every round is a full tie priced at 1.0
/// - the sum of all balances equals clicks minus rounds
/// - no bidder ends with a positive balance

use rand::{rngs::StdRng, SeedableRng};
use crate::auction::{Auction, AuctionError};
use crate::bidders::{BidderType, Bidders};
use crate::settlement::SettlementType;
use crate::simulationrun::{SimulationParams, SimulationRun, SimulationStat};
use crate::users::Users;
use crate::scenarios::Validation;
use crate::logger::{Logger, LogEvent};
use crate::logln;
use crate::utils::get_seed;

inventory::submit!(crate::scenarios::ScenarioEntry {
    short_name: "fixed_ledger",
    run,
});

pub fn simulation_params() -> SimulationParams {
    SimulationParams {
        num_users: 7,
        num_bidders: 5,
        num_rounds: 10,
    }
}

pub fn prepare_auction(params: SimulationParams) -> Result<Auction, AuctionError> {
    let users = Users::new(params.num_users, &mut StdRng::seed_from_u64(get_seed(1991)));

    let mut bidders = Bidders::new();
    for i in 0..params.num_bidders {
        bidders.add(format!("Fixed {}", i + 1), BidderType::FIXED, params.num_users, params.num_rounds);
    }

    Auction::new(users, bidders, SettlementType::AUCTION_LEDGER, StdRng::seed_from_u64(get_seed(2992)))
}

pub fn run(scenario_name: &str, logger: &mut Logger) -> Result<(), Box<dyn std::error::Error>> {
    let params = simulation_params();
    let mut auction = prepare_auction(params)?;
    logln!(logger, LogEvent::Simulation, "Initialized {} users, {} fixed bidders, {} rounds",
        params.num_users, params.num_bidders, params.num_rounds);

    let simulation_run = SimulationRun::new(&mut auction, params.num_rounds, logger)?;
    let stats = SimulationStat::new(&auction, &simulation_run);
    stats.printout(&auction, logger);

    logln!(logger, LogEvent::Scenario, "");
    let mut validation = Validation::new();

    let full_ties = simulation_run.results.iter()
        .filter(|r| r.tied_bidders == params.num_bidders && r.winning_price == 1.0)
        .count();
    validation.check(logger, full_ties == params.num_rounds, format!(
        "Every round is a {}-way tie priced at 1.000: {} / {}",
        params.num_bidders, full_ties, params.num_rounds
    ));

    let total_balance: f64 = stats.bidder_stats.iter().filter_map(|s| s.final_balance).sum();
    let expected_total = stats.overall_stat.clicks as f64 - params.num_rounds as f64;
    validation.check(logger, total_balance == expected_total, format!(
        "Total balance equals clicks minus rounds: {:.3} == {:.3}",
        total_balance, expected_total
    ));

    let max_balance = stats.bidder_stats.iter()
        .filter_map(|s| s.final_balance)
        .fold(f64::NEG_INFINITY, f64::max);
    validation.check(logger, max_balance <= 0.0, format!(
        "No fixed bidder makes a profit at price 1.000: highest balance {:.3}",
        max_balance
    ));

    validation.finish(scenario_name)
}
