/// Bidding strategies and the container holding the bidder population
///
/// Two strategies are provided:
/// - BidderFixed always bids 1.0 and learns nothing. It is the control group.
/// - BidderAdaptive bids the running mean of observed winning prices plus a small increment,
///   never more than its balance, and stops bidding altogether once in debt.

use crate::utils::round_to_millis;

pub use crate::bidder::BidderTrait;

/// Bid placed by the fixed strategy, and the adaptive strategy's opening bid
pub const OPENING_BID: f64 = 1.0;

/// Added on top of the learned market price to win against bidders that only match it
pub const BID_INCREMENT: f64 = 0.01;

/// Bidder type determining the bidding strategy
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BidderType {
    FIXED,
    ADAPTIVE,
}

/// Baseline bidder, always bids the same amount and ignores every outcome
pub struct BidderFixed {
    pub bidder_name: String,
    pub num_users: usize,
    pub num_rounds: usize,
}

impl BidderFixed {
    pub fn new(bidder_name: String, num_users: usize, num_rounds: usize) -> Self {
        Self {
            bidder_name,
            num_users,
            num_rounds,
        }
    }
}

impl BidderTrait for BidderFixed {
    fn bidder_name(&self) -> &str {
        &self.bidder_name
    }

    fn bid(&self, _user_id: usize) -> f64 {
        OPENING_BID
    }

    fn notify(&mut self, _auction_winner: bool, _price: f64, _clicked: Option<bool>) {}

    fn balance(&self) -> Option<f64> {
        None
    }

    fn get_bidding_type(&self) -> String {
        format!("Fixed {:.3} ({} users, {} rounds)", OPENING_BID, self.num_users, self.num_rounds)
    }
}

/// Bidder learning the market clearing price as the mean of every winning price it has seen
///
/// The balance invariant: balance is exactly the sum over won rounds of (1 if clicked else 0) - price.
/// Lost rounds only feed the price history.
pub struct BidderAdaptive {
    pub bidder_name: String,
    pub num_users: usize,
    pub num_rounds: usize,
    balance: f64,
    winning_price_history: Vec<f64>,
}

impl BidderAdaptive {
    pub fn new(bidder_name: String, num_users: usize, num_rounds: usize) -> Self {
        Self {
            bidder_name,
            num_users,
            num_rounds,
            balance: 0.0,
            winning_price_history: Vec::with_capacity(num_rounds),
        }
    }

    fn mean_winning_price(&self) -> Option<f64> {
        if self.winning_price_history.is_empty() {
            return None;
        }
        let total: f64 = self.winning_price_history.iter().sum();
        Some(total / self.winning_price_history.len() as f64)
    }
}

impl BidderTrait for BidderAdaptive {
    fn bidder_name(&self) -> &str {
        &self.bidder_name
    }

    fn bid(&self, _user_id: usize) -> f64 {
        // In debt, stop competing
        if self.balance < 0.0 {
            return 0.0;
        }

        let mean_price = match self.mean_winning_price() {
            Some(mean_price) => mean_price,
            // Nothing observed yet, open aggressively to gather information
            None => return OPENING_BID,
        };

        // Never bid more than can be afforded
        round_to_millis((mean_price + BID_INCREMENT).min(self.balance))
    }

    fn notify(&mut self, auction_winner: bool, price: f64, clicked: Option<bool>) {
        self.winning_price_history.push(price);
        if auction_winner {
            let gain = if clicked == Some(true) { 1.0 } else { 0.0 };
            self.balance += gain - price;
        }
    }

    fn balance(&self) -> Option<f64> {
        Some(self.balance)
    }

    fn get_bidding_type(&self) -> String {
        match self.mean_winning_price() {
            Some(mean_price) => format!(
                "Adaptive mean price {:.3} over {}/{} rounds ({} users)",
                mean_price,
                self.winning_price_history.len(),
                self.num_rounds,
                self.num_users
            ),
            None => format!("Adaptive, no history ({} users, {} rounds)", self.num_users, self.num_rounds),
        }
    }
}

/// Container for the bidder population
/// The index in the vector is the bidder_id used by the auction and its ledger
pub struct Bidders {
    pub bidders: Vec<Box<dyn BidderTrait>>,
}

impl Bidders {
    pub fn new() -> Self {
        Self {
            bidders: Vec::new(),
        }
    }

    /// Add a bidder to the collection
    ///
    /// # Arguments
    /// * `bidder_name` - Name of the bidder
    /// * `bidder_type` - Bidding strategy
    /// * `num_users` - Size of the user population, informational
    /// * `num_rounds` - Number of rounds the simulation will run, informational
    ///
    /// # Returns
    /// The bidder_id of the just added bidder
    pub fn add(&mut self, bidder_name: String, bidder_type: BidderType, num_users: usize, num_rounds: usize) -> usize {
        let bidder: Box<dyn BidderTrait> = match bidder_type {
            BidderType::FIXED => Box::new(BidderFixed::new(bidder_name, num_users, num_rounds)),
            BidderType::ADAPTIVE => Box::new(BidderAdaptive::new(bidder_name, num_users, num_rounds)),
        };
        self.add_advanced(bidder)
    }

    /// Add a pre-constructed bidder implementing BidderTrait
    ///
    /// # Returns
    /// The bidder_id of the just added bidder
    pub fn add_advanced(&mut self, bidder: Box<dyn BidderTrait>) -> usize {
        let bidder_id = self.bidders.len();
        self.bidders.push(bidder);
        bidder_id
    }

    pub fn len(&self) -> usize {
        self.bidders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bidders.is_empty()
    }
}

impl Default for Bidders {
    fn default() -> Self {
        Self::new()
    }
}
