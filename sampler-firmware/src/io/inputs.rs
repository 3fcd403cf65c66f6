use crate::unwrap_simple::UnwrapSimple;
use embedded_hal::digital::v2::InputPin;
use pinwatch_protocol::{Level, ReadPins};

/// D4 to D7, each with the internal pull-up enabled.
pub(crate) struct PullUpInputs<A: InputPin, B: InputPin, C: InputPin, D: InputPin> {
    pub d4: A,
    pub d5: B,
    pub d6: C,
    pub d7: D,
}

#[macro_export]
macro_rules! pull_up_inputs {
    ($pins:expr) => {
        $crate::io::inputs::PullUpInputs {
            d4: $pins.d4.into_pull_up_input(),
            d5: $pins.d5.into_pull_up_input(),
            d6: $pins.d6.into_pull_up_input(),
            d7: $pins.d7.into_pull_up_input(),
        }
    };
}

fn level<P: InputPin>(pin: &P) -> Level {
    Level::from(pin.is_high().unwrap_simple())
}

impl<A: InputPin, B: InputPin, C: InputPin, D: InputPin> ReadPins for PullUpInputs<A, B, C, D> {
    fn read(&self) -> [Level; 4] {
        [
            level(&self.d4),
            level(&self.d5),
            level(&self.d6),
            level(&self.d7),
        ]
    }
}
