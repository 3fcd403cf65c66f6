use atmega_hal::pac::TC0;
use avr_device::interrupt::Mutex;
use core::cell::Cell;
use pinwatch_protocol::{Clock, TimeMillis};

pub(crate) type Delay = atmega_hal::delay::Delay<super::CoreClock>;

// 16 MHz / 64 / 250 gives one compare match per millisecond
const PRESCALER: u32 = 64;
const TIMER_COUNTS: u32 = 250;
const MILLIS_INCREMENT: TimeMillis = PRESCALER * TIMER_COUNTS / 16_000;

static MILLIS_COUNTER: Mutex<Cell<TimeMillis>> = Mutex::new(Cell::new(0));

pub(crate) fn millis_init(tc0: TC0) {
    tc0.tccr0a.write(|w| w.wgm0().ctc());
    tc0.ocr0a.write(|w| w.bits((TIMER_COUNTS - 1) as u8));
    tc0.tccr0b.write(|w| w.cs0().prescale_64());
    tc0.timsk0.write(|w| w.ocie0a().set_bit());

    avr_device::interrupt::free(|cs| {
        MILLIS_COUNTER.borrow(cs).set(0);
    });
}

#[avr_device::interrupt(atmega328p)]
fn TIMER0_COMPA() {
    avr_device::interrupt::free(|cs| {
        let counter = MILLIS_COUNTER.borrow(cs);
        counter.set(counter.get().wrapping_add(MILLIS_INCREMENT));
    })
}

pub(crate) fn millis() -> TimeMillis {
    avr_device::interrupt::free(|cs| MILLIS_COUNTER.borrow(cs).get())
}

/// Milliseconds since `millis_init`, wrapping after about 49 days.
pub(crate) struct Millis;

impl Clock for Millis {
    fn now(&self) -> TimeMillis {
        millis()
    }
}
