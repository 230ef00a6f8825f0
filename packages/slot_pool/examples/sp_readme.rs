//! Demonstrates basic usage of `slot_pool` as shown in the package documentation.

use std::fmt::Write as _;
use std::thread;

use slot_pool::{Pool, PoolPolicy};

fn main() -> Result<(), slot_pool::Error> {
    println!("=== Slot Pool Example ===");

    let policy =
        PoolPolicy::new(|_| String::with_capacity(128), 4)?.with_reinitialize(String::clear);
    let pool = Pool::new(policy);

    // Items are created on demand and go back to the pool when the scoped handle is dropped.
    {
        let mut greeting = pool.get_scoped()?;
        greeting.push_str("Hello from the pool");
        println!("Built message: {}", *greeting);
    }

    println!("After scoped use: {pool}");

    // The pool can be shared between threads without any locking.
    thread::scope(|s| {
        for worker in 0..4 {
            let pool = &pool;

            s.spawn(move || {
                for iteration in 0..1000 {
                    let mut message = pool.get().expect("pool is not disposed while in use");
                    assert!(message.is_empty(), "reused items are always cleared");

                    write!(message, "worker {worker} iteration {iteration}")
                        .expect("writing to a String cannot fail");
                    pool.return_item(message);
                }
            });
        }
    });

    println!("After threaded use: {pool}");

    pool.dispose();
    println!("Disposed: {}", pool.is_disposed());

    Ok(())
}
