use atmega_hal::port::Pin;

avr_hal_generic::renamed_pins! {
    pub struct Pins {
        pub d0: atmega_hal::port::PD0 = pd0,
        pub d1: atmega_hal::port::PD1 = pd1,

        pub d4: atmega_hal::port::PD4 = pd4,
        pub d5: atmega_hal::port::PD5 = pd5,
        pub d6: atmega_hal::port::PD6 = pd6,
        pub d7: atmega_hal::port::PD7 = pd7,

        pub d13: atmega_hal::port::PB5 = pb5, /// On board LED
    }

    impl Pins {
        type Pin = Pin;
        type McuPins = atmega_hal::Pins;
    }
}
