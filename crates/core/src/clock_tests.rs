// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn fake_clock_advances_both_instant_and_epoch() {
    let clock = FakeClock::new();
    let before_epoch = clock.epoch_ms();
    let before_instant = clock.now();

    clock.advance(Duration::from_secs(30));

    assert_eq!(clock.epoch_ms(), before_epoch + 30_000);
    assert!(clock.now() >= before_instant + Duration::from_secs(30));
}

#[test]
fn fake_clock_epoch_can_be_pinned() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(42);
    assert_eq!(clock.epoch_ms(), 42);
}

#[test]
fn system_clock_epoch_is_recent() {
    let clock = SystemClock;
    // Anything after 2020-01-01 in epoch ms.
    assert!(clock.epoch_ms() > 1_577_836_800_000);
}
