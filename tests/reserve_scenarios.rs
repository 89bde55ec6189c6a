//! Reserve buy-back scenarios from spec.md §8 ("concrete scenarios" 2 & 3).

use holobourse::agent::Compatibility;
use holobourse::{AgentId, Exchange, Order, Price, ReserveAgent, Symbol};

struct AllCompatible;
impl Compatibility for AllCompatible {
    fn compatible(&self, _buyer: AgentId, _seller: AgentId) -> bool {
        true
    }
}

struct HostOnly(AgentId);
impl Compatibility for HostOnly {
    fn compatible(&self, _buyer: AgentId, seller: AgentId) -> bool {
        seller == self.0
    }
}

#[test]
fn retire_consumes_tranche_and_removes_bid() {
    let security = Symbol::new("HoloFuel/USD");
    let currency = Symbol::new("USD");
    let mut exchange = Exchange::new("USD");
    exchange.get_or_create(&security, &currency).unwrap();

    let mut reserve = ReserveAgent::new("HoloFuel/USD Reserve", 0.0, 1.0, security.clone());
    reserve.core.currency_preference = Some(currency.clone());
    reserve.reserves.insert(0.0007, 100.0);
    let reserve_id = reserve.id();
    exchange.market_mut(&security).unwrap().set_reserve(reserve_id);

    // Posts the buy-back ladder: one tranche, 100 units @ 0.0007.
    reserve.run(&mut exchange, 0.0);
    let prices = exchange.price(&security);
    assert_eq!(prices.bid.unwrap().price, Price::Limited(0.0007));
    assert!(prices.last.is_none());

    // An outside agent sells 100 straight into the reserve's bid.
    let a1 = AgentId::fresh();
    exchange
        .enter(Order::new(security.clone(), Price::Limited(0.0007), currency.clone(), 1.0, -100.0, a1), false)
        .unwrap();

    let trades = {
        let market = exchange.market_mut(&security).unwrap();
        market.execute(2.0, &AllCompatible)
    };
    assert_eq!(trades.len(), 1);
    for (buy, sell) in &trades {
        if buy.agent == reserve_id {
            reserve.record(buy.clone());
        }
        if sell.agent == reserve_id {
            reserve.record(sell.clone());
        }
    }
    assert!(reserve.reserves.0.is_empty());

    let market = exchange.market_mut(&security).unwrap();
    reserve.after_market_execute(market, 2.0);
    let prices = exchange.price(&security);
    assert!(prices.bid.is_none());
}

#[test]
fn hosts_only_reserve_rejects_non_host_sellers() {
    let security = Symbol::new("HoloFuel/USD");
    let currency = Symbol::new("USD");
    let mut exchange = Exchange::new("USD");
    exchange.get_or_create(&security, &currency).unwrap();

    let host = AgentId::fresh();
    let mut reserve = ReserveAgent::new("hosts-only reserve", 0.0, 1.0, security.clone()).with_hosts_only([host]);
    reserve.core.currency_preference = Some(currency.clone());
    reserve.reserves.insert(0.138, 100.0);
    reserve.reserves.insert(0.139, 100.0);
    reserve.reserves.insert(0.140, 100.0);
    let reserve_id = reserve.id();
    exchange.market_mut(&security).unwrap().set_reserve(reserve_id);
    reserve.run(&mut exchange, 0.0);

    let outsider = AgentId::fresh();
    exchange
        .enter(Order::new(security.clone(), Price::Limited(0.138), currency.clone(), 0.0, -100.0, outsider), false)
        .unwrap();

    // Only the reserve can evaluate `compatible`; simulate the registry's
    // dispatch directly since this test has no AgentRegistry of its own.
    let trades = {
        let market = exchange.market_mut(&security).unwrap();
        market.execute(1.0, &HostOnly(host))
    };
    assert!(trades.is_empty(), "the non-host's sell must not match any reserve tranche");

    exchange
        .enter(Order::new(security.clone(), Price::Limited(0.138), currency.clone(), 1.0, -100.0, host), false)
        .unwrap();
    let trades = {
        let market = exchange.market_mut(&security).unwrap();
        market.execute(2.0, &HostOnly(host))
    };
    assert_eq!(trades.len(), 1);
    let (buy, _sell) = &trades[0];
    // The highest tranche (0.140) is matched first, but the reserve's
    // ladder entered first: rule 3a resolves the price to the later
    // entrant's price, the host's ask of 0.138.
    assert_eq!(buy.price, Price::Limited(0.138));
}
