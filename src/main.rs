//! Demo suite
//!
//! Exercises nesting, hook inheritance, async bodies, timeouts and the three
//! runners:
//!
//! ```text
//! rosespec run --runner parallel -j 2
//! rosespec list --grep "/quux$/"
//! ```

use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rosespec::{Hook, Suite};
use tracing::debug;

fn main() -> ExitCode {
    rosespec::run(demo_suite())
}

fn demo_suite() -> Suite {
    Suite::new(|b| {
        b.describe("Foo", |b| {
            let opened = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&opened);
            b.before_each(Hook::sync(move || {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                debug!("opened fixture #{n}");
                Ok(())
            }))?;

            b.it("bar", Hook::sync(|| Ok(())))?;

            b.describe("Baz", |b| {
                b.before_each(Hook::future(|| async {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    Ok(())
                }))?;

                b.it("qux", Hook::sync(|| {
                    let word = "qux".to_uppercase();
                    anyhow::ensure!(word == "QUX", "unexpected {word}");
                    Ok(())
                }))?;

                b.it("quux", Hook::sync(|| {
                    let total: u32 = [1, 1].iter().sum();
                    anyhow::ensure!(total == 3, "expected 3, got {total}");
                    Ok(())
                }))?;

                b.after_each(Hook::sync(|| {
                    debug!("leaving Baz");
                    Ok(())
                }))
            })?;

            let counter = Arc::clone(&opened);
            b.after_each(Hook::sync(move || {
                debug!("{} fixtures opened so far", counter.load(Ordering::SeqCst));
                Ok(())
            }))
        })?;

        b.describe("Async", |b| {
            b.timeout(Duration::from_millis(500))?;

            b.it("resolves a future", Hook::future(|| async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(())
            }))?;

            b.it("calls done", Hook::callback(|done| {
                std::thread::spawn(move || {
                    std::thread::sleep(Duration::from_millis(10));
                    done.ok();
                });
            }))?
            .timeout(Duration::from_millis(200));

            Ok(())
        })?;

        b.describe("Stuck", |b| {
            b.timeout(Duration::from_millis(100))?;
            b.it("blocks past its timeout", Hook::sync(|| {
                std::thread::sleep(Duration::from_secs(10));
                Ok(())
            }))?;
            Ok(())
        })
    })
}
