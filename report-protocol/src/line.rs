use crate::{sampler::Level, PinId, MONITORED_PINS};

/// Terminator written after every report line.
pub const LINE_TERMINATOR: &str = "\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinValue {
    pub pin: PinId,

    /// `1` when the pin is held low (active), `0` otherwise.
    pub value: u8,
}

/// One reporting cycle, rendered as `4,<v4>,5,<v5>,6,<v6>,7,<v7>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    pins: [PinValue; MONITORED_PINS.len()],
}

impl Report {
    /// Builds a report from raw levels given in [`MONITORED_PINS`] order.
    pub fn from_levels(levels: [Level; MONITORED_PINS.len()]) -> Self {
        let pins = core::array::from_fn(|i| PinValue {
            pin: MONITORED_PINS[i],
            value: levels[i].reported_value(),
        });
        Self { pins }
    }

    pub fn pins(&self) -> &[PinValue] {
        &self.pins
    }
}

impl ufmt::uDisplay for Report {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        for (i, p) in self.pins.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            ufmt::uwrite!(f, "{},{}", p.pin, p.value)?;
        }
        Ok(())
    }
}

impl core::fmt::Display for Report {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for (i, p) in self.pins.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{},{}", p.pin, p.value)?;
        }
        Ok(())
    }
}

#[cfg(feature = "std")]
pub use self::parse::{parse_line, ParseError, PinStates};

#[cfg(feature = "std")]
mod parse {
    use crate::{PinId, MONITORED_PINS};
    use std::collections::BTreeMap;

    #[derive(thiserror::Error, Debug, PartialEq, Eq)]
    pub enum ParseError {
        #[error("Odd number of CSV fields ({0})")]
        OddFieldCount(usize),

        #[error("Invalid pin number \"{0}\"")]
        InvalidPin(String),

        #[error("Invalid pin value \"{0}\"")]
        InvalidValue(String),
    }

    /// Pin values decoded from a received report line.
    #[derive(Debug, Default, Clone, PartialEq, Eq)]
    pub struct PinStates {
        states: BTreeMap<PinId, u8>,
    }

    impl PinStates {
        pub fn get(&self, pin: PinId) -> Option<u8> {
            self.states.get(&pin).copied()
        }

        /// Values of [`MONITORED_PINS`], in that order.
        pub fn for_monitored_pins(&self) -> [Option<u8>; MONITORED_PINS.len()] {
            MONITORED_PINS.map(|pin| self.get(pin))
        }

        pub fn is_empty(&self) -> bool {
            self.states.is_empty()
        }
    }

    impl FromIterator<(PinId, u8)> for PinStates {
        fn from_iter<T: IntoIterator<Item = (PinId, u8)>>(iter: T) -> Self {
            Self {
                states: iter.into_iter().collect(),
            }
        }
    }

    /// Parses a `pin,value,pin,value,...` line.
    ///
    /// Fields are trimmed and empty fields are ignored, so a trailing comma or
    /// line terminator is accepted.
    pub fn parse_line(line: &str) -> Result<PinStates, ParseError> {
        let fields: Vec<&str> = line
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .collect();

        let pairs = fields.chunks_exact(2);
        if !pairs.remainder().is_empty() {
            return Err(ParseError::OddFieldCount(fields.len()));
        }

        pairs
            .map(|pair| {
                let pin = pair[0]
                    .parse::<PinId>()
                    .map_err(|_| ParseError::InvalidPin(pair[0].to_owned()))?;
                let value = pair[1]
                    .parse::<u8>()
                    .map_err(|_| ParseError::InvalidValue(pair[1].to_owned()))?;
                Ok((pin, value))
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sampler::Level::{High, Low};

    #[test]
    fn mixed_levels() {
        let report = Report::from_levels([High, Low, High, High]);
        assert_eq!(report.to_string(), "4,0,5,1,6,0,7,0");
        assert_eq!(report.pins()[1], PinValue { pin: 5, value: 1 });
    }

    #[test]
    fn all_low() {
        let report = Report::from_levels([Low; 4]);
        assert_eq!(report.to_string(), "4,1,5,1,6,1,7,1");
    }

    #[test]
    fn all_high() {
        let report = Report::from_levels([High; 4]);
        assert_eq!(report.to_string(), "4,0,5,0,6,0,7,0");
    }

    #[test]
    fn udisplay_matches_display() {
        struct Sink(String);

        impl ufmt::uWrite for Sink {
            type Error = core::convert::Infallible;

            fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
                self.0.push_str(s);
                Ok(())
            }
        }

        let report = Report::from_levels([Low, High, Low, High]);
        let mut sink = Sink(String::new());
        ufmt::uwrite!(&mut sink, "{}", report).unwrap();

        assert_eq!(sink.0, report.to_string());
        assert_eq!(sink.0, "4,1,5,0,6,1,7,0");
    }

    #[test]
    fn parse_report_line() {
        let states = parse_line("4,0,5,1,6,0,7,0").unwrap();
        assert_eq!(states.for_monitored_pins(), [Some(0), Some(1), Some(0), Some(0)]);
    }

    #[test]
    fn parse_tolerates_whitespace_and_trailing_comma() {
        let states = parse_line(" 4, 1 ,5,1,\r\n").unwrap();
        assert_eq!(states.get(4), Some(1));
        assert_eq!(states.get(5), Some(1));
        assert_eq!(states.get(6), None);
    }

    #[test]
    fn parse_repeated_pin_keeps_last() {
        let states = parse_line("4,0,4,1").unwrap();
        assert_eq!(states, [(4, 1)].into_iter().collect::<PinStates>());
    }

    #[test]
    fn parse_empty_line() {
        assert!(parse_line("").unwrap().is_empty());
    }

    #[test]
    fn parse_odd_field_count() {
        assert_eq!(parse_line("4,0,5"), Err(ParseError::OddFieldCount(3)));
    }

    #[test]
    fn parse_invalid_fields() {
        assert_eq!(
            parse_line("x,0"),
            Err(ParseError::InvalidPin("x".to_owned()))
        );
        assert_eq!(
            parse_line("4,-1"),
            Err(ParseError::InvalidValue("-1".to_owned()))
        );
    }

    #[test]
    fn parse_what_the_reporter_prints() {
        let report = Report::from_levels([Low, Low, High, Low]);
        let line = format!("{report}{LINE_TERMINATOR}");
        let states = parse_line(&line).unwrap();

        for p in report.pins() {
            assert_eq!(states.get(p.pin), Some(p.value));
        }
    }
}
