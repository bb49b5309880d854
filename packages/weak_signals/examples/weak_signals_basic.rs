//! Demonstrates broadcasting signals to weakly observed listeners with `weak_signals`.
//!
//! This example shows listeners coming and going, a listener that detaches itself while being
//! notified, and a queue that defers signals until they are explicitly delivered.

use std::cell::Cell;
use std::rc::Rc;

use weak_signals::{Dispatcher, Observable, Observe, QueueReceiver, SignalResult, Transmitter};

trait Stock {
    fn price_changed(&self, symbol: &'static str, cents: u64) -> SignalResult;
}

struct Trader {
    name: &'static str,
    observable: Observable,
    trades: Cell<u32>,
    // Stops listening after the first price above this limit.
    limit: Option<u64>,
}

impl Trader {
    fn new(name: &'static str, limit: Option<u64>) -> Rc<Self> {
        Rc::new(Self {
            name,
            observable: Observable::new(),
            trades: Cell::new(0),
            limit,
        })
    }
}

impl Stock for Trader {
    fn price_changed(&self, symbol: &'static str, cents: u64) -> SignalResult {
        println!("  {} sees {symbol} at {cents} cents", self.name);
        self.trades.set(self.trades.get().wrapping_add(1));

        if self.limit.is_some_and(|limit| cents > limit) {
            println!("  {} leaves the market", self.name);
            self.release_observers();
        }

        Ok(())
    }
}

impl Observe for Trader {
    fn observable(&self) -> &Observable {
        &self.observable
    }

    fn observation_changed(&self) {
        let state = if self.is_observed() { "listening" } else { "idle" };
        println!("  {} is now {state}", self.name);
    }
}

impl Transmitter<dyn Stock> for Trader {
    fn receiver(&self) -> Option<&(dyn Stock + 'static)> {
        Some(self)
    }
}

fn main() -> SignalResult {
    println!("=== weak_signals basic example ===");
    println!();

    let market = Dispatcher::<dyn Stock>::builder().name("market").build();

    println!("Attaching traders:");
    let alice = Trader::new("alice", None);
    let bob = Trader::new("bob", Some(150));
    market.attach(&alice);
    market.attach(&bob);
    println!();

    println!("Broadcasting prices:");
    market.send(|listener| listener.price_changed("ACME", 120))?;
    market.send(|listener| listener.price_changed("ACME", 180))?;
    market.send(|listener| listener.price_changed("ACME", 110))?;
    println!("  alice traded {} times", alice.trades.get());
    println!("  bob traded {} times", bob.trades.get());
    println!();

    println!("Deferring signals through a queue:");
    let queue = Rc::new(QueueReceiver::<dyn Stock>::new());
    let carol = Trader::new("carol", None);
    market.attach(&queue);
    queue.downstream().attach(&carol);

    market.send(|listener| listener.price_changed("INIT", 10))?;
    market.send(|listener| listener.price_changed("INIT", 11))?;
    println!("  {} signals waiting", queue.len());

    while queue.pop_signal()? {}
    println!();

    println!("Dropping alice:");
    drop(alice);
    market.send(|listener| listener.price_changed("ACME", 100))?;
    println!();

    println!("Dropping the market:");
    drop(market);
    println!("  queue still attached: {}", queue.is_observed());

    Ok(())
}
