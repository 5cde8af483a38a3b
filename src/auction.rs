use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;
use crate::bidders::Bidders;
use crate::settlement::{create_settlement, SettlementTrait, SettlementType};
use crate::users::Users;
use crate::logger::{LogEvent, Logger};
use crate::logln;
use crate::utils::{round_to_millis, VERBOSE_AUCTION};
use std::sync::atomic::Ordering;

/// Precondition violations of the auction
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuctionError {
    #[error("auction needs at least one user")]
    NoUsers,
    #[error("auction needs at least one bidder")]
    NoBidders,
    #[error("bidder {bidder_id} returned a bid that cannot be clamped: {bid}")]
    InvalidBid { bidder_id: usize, bid: f64 },
}

/// Winner and price of a single auction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuctionOutcome {
    pub winner_id: usize,
    pub winning_price: f64,
    pub tied_bidders: usize,
}

/// Everything that happened in one round
#[derive(Debug, Clone, PartialEq)]
pub struct RoundResult {
    pub round: usize,
    pub user_id: usize,
    /// Recorded bids (clamped and rounded), indexed by bidder_id
    pub bids: Vec<f64>,
    pub winner_id: usize,
    pub winning_price: f64,
    pub tied_bidders: usize,
    pub clicked: bool,
}

impl RoundResult {
    pub fn is_tie(&self) -> bool {
        self.tied_bidders > 1
    }

    /// Net gain of the winner for this round
    pub fn winner_gain(&self) -> f64 {
        let gain = if self.clicked { 1.0 } else { 0.0 };
        gain - self.winning_price
    }
}

/// Turn a raw bid into the amount the auction works with
/// Negative bids (-inf included) are clamped to 0.0, everything is rounded to 3 decimals.
/// NaN and +inf have no meaningful clamp and are rejected.
pub fn sanitize_bid(bidder_id: usize, bid: f64) -> Result<f64, AuctionError> {
    if bid.is_nan() || bid == f64::INFINITY {
        return Err(AuctionError::InvalidBid { bidder_id, bid });
    }
    Ok(round_to_millis(bid.max(0.0)))
}

/// Determine winner and price of a second price auction
///
/// The winner is drawn uniformly among all bidders sharing the highest bid, so registration order
/// gives no advantage. With a tie at the top the price is the tied value, otherwise it is the
/// highest of the remaining bids, or 0.0 when there is no other bid.
///
/// Returns None when there are no bids.
pub fn determine_winner(bids: &[f64], rng: &mut StdRng) -> Option<AuctionOutcome> {
    let highest_bid = bids.iter().copied().reduce(f64::max)?;

    let tied: Vec<usize> = bids
        .iter()
        .enumerate()
        .filter(|&(_, &bid)| bid == highest_bid)
        .map(|(bidder_id, _)| bidder_id)
        .collect();
    let winner_id = *tied.choose(rng)?;

    let winning_price = if tied.len() > 1 {
        highest_bid
    } else {
        bids.iter()
            .enumerate()
            .filter(|(bidder_id, _)| *bidder_id != winner_id)
            .map(|(_, &bid)| bid)
            .reduce(f64::max)
            .unwrap_or(0.0)
    };

    Some(AuctionOutcome {
        winner_id,
        winning_price,
        tied_bidders: tied.len(),
    })
}

/// Repeated second price auction over a fixed set of users and bidders
pub struct Auction {
    users: Users,
    bidders: Bidders,
    settlement: Box<dyn SettlementTrait>,
    rng: StdRng,
    rounds_executed: usize,
}

impl Auction {
    /// Create an auction bound to the given populations
    ///
    /// # Arguments
    /// * `users` - Users that can be shown the ad, at least one
    /// * `bidders` - Competing bidders, at least one
    /// * `settlement_type` - Whether the auction or the bidders keep the balances
    /// * `rng` - Random stream for user selection, tie-breaks and clicks
    pub fn new(users: Users, bidders: Bidders, settlement_type: SettlementType, rng: StdRng) -> Result<Self, AuctionError> {
        if users.is_empty() {
            return Err(AuctionError::NoUsers);
        }
        if bidders.is_empty() {
            return Err(AuctionError::NoBidders);
        }
        let settlement = create_settlement(settlement_type, bidders.len());
        Ok(Self {
            users,
            bidders,
            settlement,
            rng,
            rounds_executed: 0,
        })
    }

    pub fn bidders(&self) -> &Bidders {
        &self.bidders
    }

    pub fn users(&self) -> &Users {
        &self.users
    }

    pub fn rounds_executed(&self) -> usize {
        self.rounds_executed
    }

    pub fn get_settlement_type(&self) -> String {
        self.settlement.get_settlement_type()
    }

    /// Balance of every bidder as known to the settlement strategy, indexed by bidder_id
    pub fn balances(&self) -> Vec<Option<f64>> {
        self.bidders
            .bidders
            .iter()
            .enumerate()
            .map(|(bidder_id, bidder)| self.settlement.balance(bidder_id, bidder.as_ref()))
            .collect()
    }

    /// Execute one round: select a user, collect bids, pick winner and price, show the ad,
    /// notify every bidder and settle the winner's balance
    pub fn execute_round(&mut self, logger: &mut Logger) -> Result<RoundResult, AuctionError> {
        let user_id = self.rng.gen_range(0..self.users.len());

        let mut bids = Vec::with_capacity(self.bidders.len());
        for (bidder_id, bidder) in self.bidders.bidders.iter().enumerate() {
            bids.push(sanitize_bid(bidder_id, bidder.bid(user_id))?);
        }

        let outcome = determine_winner(&bids, &mut self.rng).ok_or(AuctionError::NoBidders)?;

        let clicked = self.users.users[user_id].observe_click(&mut self.rng);

        for (bidder_id, bidder) in self.bidders.bidders.iter_mut().enumerate() {
            if bidder_id == outcome.winner_id {
                bidder.notify(true, outcome.winning_price, Some(clicked));
            } else {
                bidder.notify(false, outcome.winning_price, None);
            }
        }

        self.settlement.settle(outcome.winner_id, clicked, outcome.winning_price);

        let result = RoundResult {
            round: self.rounds_executed,
            user_id,
            bids,
            winner_id: outcome.winner_id,
            winning_price: outcome.winning_price,
            tied_bidders: outcome.tied_bidders,
            clicked,
        };
        self.rounds_executed += 1;

        if VERBOSE_AUCTION.load(Ordering::Relaxed) {
            log_round_csv(&result, logger);
        }

        Ok(result)
    }
}

/// Log a round as CSV: round, user_id, winner_id, winning_price, tied_bidders, clicked, then every bid
fn log_round_csv(result: &RoundResult, logger: &mut Logger) {
    let mut csv_fields = vec![
        format!("{}", result.round),
        format!("{}", result.user_id),
        format!("{}", result.winner_id),
        format!("{:.3}", result.winning_price),
        format!("{}", result.tied_bidders),
        format!("{}", result.clicked),
    ];
    csv_fields.extend(result.bids.iter().map(|bid| format!("{:.3}", bid)));
    logln!(logger, LogEvent::Auction, "{}", csv_fields.join(","));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bidders::{BidderTrait, BidderType};
    use crate::users::User;
    use rand::SeedableRng;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Notification as seen by a bidder: (auction_winner, price, clicked)
    type Notification = (bool, f64, Option<bool>);

    /// Bidder returning a fixed amount and recording every notification
    struct BidderScripted {
        amount: f64,
        notifications: Rc<RefCell<Vec<Notification>>>,
    }

    impl BidderTrait for BidderScripted {
        fn bidder_name(&self) -> &str {
            "Scripted"
        }

        fn bid(&self, _user_id: usize) -> f64 {
            self.amount
        }

        fn notify(&mut self, auction_winner: bool, price: f64, clicked: Option<bool>) {
            self.notifications.borrow_mut().push((auction_winner, price, clicked));
        }

        fn balance(&self) -> Option<f64> {
            None
        }

        fn get_bidding_type(&self) -> String {
            format!("Scripted {}", self.amount)
        }
    }

    fn scripted_bidders(amounts: &[f64]) -> (Bidders, Vec<Rc<RefCell<Vec<Notification>>>>) {
        let mut bidders = Bidders::new();
        let mut logs = Vec::new();
        for &amount in amounts {
            let notifications = Rc::new(RefCell::new(Vec::new()));
            bidders.add_advanced(Box::new(BidderScripted {
                amount,
                notifications: Rc::clone(&notifications),
            }));
            logs.push(notifications);
        }
        (bidders, logs)
    }

    fn users_with_probability(num_users: usize, click_probability: f64) -> Users {
        Users {
            users: (0..num_users).map(|_| User::with_click_probability(click_probability)).collect(),
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(2992)
    }

    #[test]
    fn test_single_highest_pays_second_price() {
        let outcome = determine_winner(&[5.0, 3.0, 1.0], &mut rng()).unwrap();
        assert_eq!(outcome.winner_id, 0);
        assert_eq!(outcome.winning_price, 3.0);
        assert_eq!(outcome.tied_bidders, 1);
    }

    #[test]
    fn test_highest_bid_position_does_not_matter() {
        let outcome = determine_winner(&[1.0, 3.0, 5.0], &mut rng()).unwrap();
        assert_eq!(outcome.winner_id, 2);
        assert_eq!(outcome.winning_price, 3.0);
    }

    #[test]
    fn test_tie_pays_tied_value() {
        let mut rng = rng();
        let mut wins = [0usize; 3];
        let trials = 10_000;
        for _ in 0..trials {
            let outcome = determine_winner(&[5.0, 5.0, 3.0], &mut rng).unwrap();
            assert_eq!(outcome.winning_price, 5.0);
            assert_eq!(outcome.tied_bidders, 2);
            wins[outcome.winner_id] += 1;
        }
        assert_eq!(wins[2], 0);
        let share_a = wins[0] as f64 / trials as f64;
        assert!((share_a - 0.5).abs() < 0.03, "share of A = {}", share_a);
    }

    #[test]
    fn test_three_way_tie_pays_tied_value() {
        let outcome = determine_winner(&[2.0, 2.0, 2.0], &mut rng()).unwrap();
        assert_eq!(outcome.winning_price, 2.0);
        assert_eq!(outcome.tied_bidders, 3);
    }

    #[test]
    fn test_single_bidder_pays_zero() {
        let outcome = determine_winner(&[5.0], &mut rng()).unwrap();
        assert_eq!(outcome.winner_id, 0);
        assert_eq!(outcome.winning_price, 0.0);
    }

    #[test]
    fn test_no_bids_no_winner() {
        assert_eq!(determine_winner(&[], &mut rng()), None);
    }

    #[test]
    fn test_sanitize_bid_clamps_and_rounds() {
        assert_eq!(sanitize_bid(0, -2.5), Ok(0.0));
        assert_eq!(sanitize_bid(0, 1.23456), Ok(1.235));
        assert_eq!(sanitize_bid(0, 0.0004), Ok(0.0));
        assert_eq!(sanitize_bid(0, 2.0), Ok(2.0));
        assert_eq!(sanitize_bid(0, f64::NEG_INFINITY), Ok(0.0));
        // 1.0005 is stored just below the half-milli
        assert_eq!(sanitize_bid(0, 1.0005), Ok(1.0));
    }

    #[test]
    fn test_sanitize_bid_rejects_nan_and_positive_infinity() {
        assert!(matches!(sanitize_bid(4, f64::NAN), Err(AuctionError::InvalidBid { bidder_id: 4, .. })));
        assert!(matches!(sanitize_bid(1, f64::INFINITY), Err(AuctionError::InvalidBid { bidder_id: 1, .. })));
    }

    #[test]
    fn test_new_rejects_empty_populations() {
        let (bidders, _) = scripted_bidders(&[1.0]);
        let result = Auction::new(Users { users: Vec::new() }, bidders, SettlementType::AUCTION_LEDGER, rng());
        assert!(matches!(result, Err(AuctionError::NoUsers)));

        let result = Auction::new(users_with_probability(3, 0.5), Bidders::new(), SettlementType::AUCTION_LEDGER, rng());
        assert!(matches!(result, Err(AuctionError::NoBidders)));
    }

    #[test]
    fn test_recorded_bids_are_clamped_and_rounded() {
        let (bidders, _) = scripted_bidders(&[-1.0, 0.12345, 2.71828]);
        let mut auction = Auction::new(users_with_probability(5, 0.5), bidders, SettlementType::AUCTION_LEDGER, rng()).unwrap();
        let result = auction.execute_round(&mut Logger::new()).unwrap();
        assert_eq!(result.bids, vec![0.0, 0.123, 2.718]);
        assert!(result.bids.iter().all(|&bid| bid >= 0.0 && round_to_millis(bid) == bid));
        assert_eq!(result.winner_id, 2);
        assert_eq!(result.winning_price, 0.123);
    }

    #[test]
    fn test_invalid_bid_fails_round() {
        let (bidders, _) = scripted_bidders(&[1.0, f64::NAN]);
        let mut auction = Auction::new(users_with_probability(2, 0.5), bidders, SettlementType::AUCTION_LEDGER, rng()).unwrap();
        let result = auction.execute_round(&mut Logger::new());
        assert!(matches!(result, Err(AuctionError::InvalidBid { bidder_id: 1, .. })));
    }

    #[test]
    fn test_every_bidder_notified_once_with_price() {
        let (bidders, logs) = scripted_bidders(&[5.0, 3.0, 1.0]);
        let mut auction = Auction::new(users_with_probability(4, 1.0), bidders, SettlementType::AUCTION_LEDGER, rng()).unwrap();
        auction.execute_round(&mut Logger::new()).unwrap();

        assert_eq!(logs[0].borrow().as_slice(), &[(true, 3.0, Some(true))]);
        assert_eq!(logs[1].borrow().as_slice(), &[(false, 3.0, None)]);
        assert_eq!(logs[2].borrow().as_slice(), &[(false, 3.0, None)]);
    }

    #[test]
    fn test_auction_ledger_settles_winner() {
        let (bidders, _) = scripted_bidders(&[5.0, 3.0]);
        let mut auction = Auction::new(users_with_probability(3, 1.0), bidders, SettlementType::AUCTION_LEDGER, rng()).unwrap();
        let mut logger = Logger::new();
        auction.execute_round(&mut logger).unwrap();
        auction.execute_round(&mut logger).unwrap();

        // Click probability 1.0, so each round gains 1.0 - 3.0
        assert_eq!(auction.balances(), vec![Some(-4.0), Some(0.0)]);
        assert_eq!(auction.rounds_executed(), 2);
    }

    #[test]
    fn test_bidder_ledger_matches_auction_ledger() {
        let build = |settlement_type| {
            let mut bidders = Bidders::new();
            for i in 0..4 {
                bidders.add(format!("Adaptive {}", i), BidderType::ADAPTIVE, 10, 50);
            }
            let users = Users::new(10, &mut StdRng::seed_from_u64(1991));
            Auction::new(users, bidders, settlement_type, rng()).unwrap()
        };
        let mut auction_ledger = build(SettlementType::AUCTION_LEDGER);
        let mut bidder_ledger = build(SettlementType::BIDDER_LEDGER);
        let mut logger = Logger::new();
        for _ in 0..50 {
            let a = auction_ledger.execute_round(&mut logger).unwrap();
            let b = bidder_ledger.execute_round(&mut logger).unwrap();
            assert_eq!(a, b);
        }
        assert_eq!(auction_ledger.balances(), bidder_ledger.balances());
        let own: Vec<Option<f64>> = auction_ledger.bidders().bidders.iter().map(|b| b.balance()).collect();
        assert_eq!(auction_ledger.balances(), own);
    }

    #[test]
    fn test_user_selection_covers_population() {
        let (bidders, _) = scripted_bidders(&[1.0]);
        let mut auction = Auction::new(users_with_probability(5, 0.5), bidders, SettlementType::AUCTION_LEDGER, rng()).unwrap();
        let mut seen = [false; 5];
        let mut logger = Logger::new();
        for _ in 0..500 {
            let result = auction.execute_round(&mut logger).unwrap();
            seen[result.user_id] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }
}
