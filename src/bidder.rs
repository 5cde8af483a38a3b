/// Trait for bidder agents competing in the auction
///
/// Every bidding strategy implements this trait independently, the auction only talks to bidders
/// through bid() and notify() and never touches their internal state.
pub trait BidderTrait {
    /// Get the bidder name
    fn bidder_name(&self) -> &str;

    /// Bid for the right to show an ad to the user with the given id
    /// The user id is opaque, strategies are free to ignore it.
    /// The auction clamps the returned amount to be non-negative and rounds it to 3 decimals.
    fn bid(&self, user_id: usize) -> f64;

    /// Called exactly once per round for every bidder, after the click outcome is known
    ///
    /// # Arguments
    /// * `auction_winner` - `true` if this bidder won the round
    /// * `price` - The round's winning price, given to winners and losers alike
    /// * `clicked` - Click outcome, `Some` only for the winner
    fn notify(&mut self, auction_winner: bool, price: f64, clicked: Option<bool>);

    /// Balance tracked by the bidder itself
    /// Returns None for strategies that keep no ledger of their own
    fn balance(&self) -> Option<f64>;

    /// Get a string representation of the bidding strategy
    fn get_bidding_type(&self) -> String;
}
