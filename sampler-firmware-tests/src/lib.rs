
#[cfg(test)]
use avr_tester::*;

#[cfg(test)]
fn avr() -> AvrTester {
    AvrTester::atmega328p()
        .with_clock_of_16_mhz()
        .load("../sampler-firmware/target/avr-atmega328p/release/sampler.elf")
}

/// Drives D4 to D7, `true` meaning high.
#[cfg(test)]
fn set_pins(avr: &mut AvrTester, levels: [bool; 4]) {
    macro_rules! drive {
        ($pin:ident, $high:expr) => {
            if $high {
                avr.pins().$pin().set_high();
            } else {
                avr.pins().$pin().set_low();
            }
        };
    }

    let [d4, d5, d6, d7] = levels;
    drive!(pd4, d4);
    drive!(pd5, d5);
    drive!(pd6, d6);
    drive!(pd7, d7);
}

/// Report lines received since the last call.
#[cfg(test)]
fn received_lines(avr: &mut AvrTester) -> Vec<String> {
    let received: String = avr.uart0().read();
    received
        .split_terminator("\r\n")
        .map(str::to_owned)
        .collect()
}
