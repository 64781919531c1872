mod counters;

pub use counters::CounterSet;
