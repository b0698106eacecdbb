use std::sync::LazyLock;

use regex::Regex;

use super::money::fix_currency;
use crate::domain::Money;

/// An authenticated balance page starts with a currency fragment followed
/// by a decimal amount. Anything else means the session is gone.
static BALANCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)(\d+\.\d+)").expect("balance pattern"));

/// Extract the account balance from a balance-probe response body.
///
/// `None` means the body does not look like an authenticated balance page.
pub fn parse_balance(body: &str) -> Option<Money> {
    let captures = BALANCE.captures(body)?;
    Some(Money {
        currency: fix_currency(&captures[1]),
        amount: captures[2].to_owned(),
    })
}
