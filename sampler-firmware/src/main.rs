#![no_std]
#![no_main]
#![feature(abi_avr_interrupt)]

mod hal;
mod io;
mod unwrap_simple;

use crate::unwrap_simple::UnwrapSimple;
use atmega_hal::prelude::*;
use pinwatch_protocol::{Reporter, BAUD_RATE};

#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    avr_device::interrupt::disable();

    let dp = unsafe { atmega_hal::Peripherals::steal() };
    let pins = hal::Pins::with_mcu_pins(atmega_hal::pins!(dp));

    let mut led = pins.d13.into_output();
    loop {
        led.toggle();
        hal::Delay::new().delay_ms(50u16);
    }
}

#[avr_device::entry]
fn main() -> ! {
    let dp = atmega_hal::Peripherals::take().unwrap_simple();
    let pins = hal::Pins::with_mcu_pins(atmega_hal::pins!(dp));

    hal::millis_init(dp.TC0);
    unsafe { avr_device::interrupt::enable() };

    let mut serial = serial!(dp, pins, BAUD_RATE);
    let inputs = pull_up_inputs!(pins);

    let clock = hal::Millis;
    let mut reporter = Reporter::default();

    loop {
        reporter.poll(&clock, &inputs, &mut serial);
    }
}
