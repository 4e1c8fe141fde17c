use defmt::{info, warn};
use ds3231::Ds3231;
use embedded_hal::digital::{InputPin, OutputPin};
use fugit::RateExtU32;
use reminder_machine::{ReminderMachine, ReminderStrategy};
use rp235x_hal::clocks::init_clocks_and_plls;
use rp235x_hal::gpio::{FunctionI2C, Interrupt, Pin, PullNone, PullUp};
use rp235x_hal::uart::{DataBits, StopBits, UartConfig, UartPeripheral};
use rp235x_hal::{Clock, Sio, Watchdog, I2C};
use rtic_monotonics::Monotonic;
use rtic_sync::make_channel;
use true_time::TrueClock;

use crate::band_clock::BandClock;
use crate::device_constants::{
    pins::{RtcSclPin, RtcSdaPin},
    RtcI2cBus, StrategyStrap, SyncUart, BOOT_CALENDAR, CORRECTION_FACTOR, SYNC_BAUD_HZ,
};
use crate::hal;
use crate::tasks::{WakeEvent, WAKE_QUEUE_DEPTH};
use crate::{app::*, Mono};

// Timestamp for logging
defmt::timestamp!("{=u64:us}", {
    Mono::now().duration_since_epoch().to_micros()
});

pub fn startup(mut ctx: init::Context<'_>) -> (Shared, Local) {
    // Reset the spinlocks - this is skipped by soft-reset
    unsafe {
        hal::sio::spinlock_reset();
    }

    info!("Hypnos startup");

    // Set up clocks
    let mut watchdog = Watchdog::new(ctx.device.WATCHDOG);
    let clocks = init_clocks_and_plls(
        XTAL_FREQ_HZ,
        ctx.device.XOSC,
        ctx.device.CLOCKS,
        ctx.device.PLL_SYS,
        ctx.device.PLL_USB,
        &mut ctx.device.RESETS,
        &mut watchdog,
    )
    .ok()
    .unwrap();

    Mono::start(ctx.device.TIMER0, &ctx.device.RESETS);

    // The single-cycle I/O block controls our GPIO pins
    let sio = Sio::new(ctx.device.SIO);

    // Set the pins to their default state
    let bank0_pins = hal::gpio::Pins::new(
        ctx.device.IO_BANK0,
        ctx.device.PADS_BANK0,
        sio.gpio_bank0,
        &mut ctx.device.RESETS,
    );

    // Configure GPIO25 as an output
    let mut led_pin = bank0_pins
        .gpio25
        .into_pull_type::<PullNone>()
        .into_push_pull_output();
    led_pin.set_low().unwrap();
    // Start the heartbeat task
    heartbeat::spawn().ok();

    // Wake events flow from the GPIO interrupt and the sync task into the
    // reminder task
    let (wake_sender, wake_receiver) = make_channel!(WakeEvent, WAKE_QUEUE_DEPTH);

    // Strategy strap selects the scheduling behavior for this wear session
    let mut strap_pin: StrategyStrap = bank0_pins.gpio2.into_pull_up_input();
    let strategy = match strap_pin.is_low() {
        Ok(true) => ReminderStrategy::TouchTimer,
        Ok(false) => ReminderStrategy::Periodic,
        Err(_) => {
            warn!("Could not read strategy strap");
            ReminderStrategy::Periodic
        }
    };
    info!("Reminder strategy: {}", strategy);

    // Haptic driver, off until the first reminder
    let mut haptic_pin = bank0_pins
        .gpio0
        .into_pull_type::<PullNone>()
        .into_push_pull_output();
    haptic_pin.set_low().unwrap();

    // Alarm INT is open drain from the RTC, falling edge on a match
    let alarm_pin = bank0_pins.gpio21.into_pull_up_input();
    alarm_pin.set_interrupt_enabled(Interrupt::EdgeLow, true);

    // Touch controller drives its output high while touched
    let touch_pin = bank0_pins.gpio22.into_pull_down_input();
    touch_pin.set_interrupt_enabled(Interrupt::EdgeHigh, true);

    // Sync UART to the dock
    let sync_uart: SyncUart = UartPeripheral::new(
        ctx.device.UART0,
        (
            bank0_pins.gpio16.into_function(),
            bank0_pins.gpio17.into_function(),
        ),
        &mut ctx.device.RESETS,
    )
    .enable(
        UartConfig::new(SYNC_BAUD_HZ.Hz(), DataBits::Eight, None, StopBits::One),
        clocks.peripheral_clock.freq(),
    )
    .unwrap();

    // I2C bus to the RTC
    let sda_pin: Pin<RtcSdaPin, FunctionI2C, PullUp> = bank0_pins.gpio14.reconfigure();
    let scl_pin: Pin<RtcSclPin, FunctionI2C, PullUp> = bank0_pins.gpio15.reconfigure();
    let i2c1: RtcI2cBus = I2C::new_controller(
        ctx.device.I2C1,
        sda_pin,
        scl_pin,
        RateExtU32::kHz(400),
        &mut ctx.device.RESETS,
        clocks.system_clock.freq(),
    );

    let mut rtc = Ds3231::new(i2c1, ds3231::ADDRESS);
    match rtc.oscillator_stopped() {
        Ok(true) => {
            warn!("RTC oscillator had stopped, kept time was lost");
            if rtc.clear_oscillator_stop_flag().is_err() {
                warn!("Could not clear the oscillator stop flag");
            }
        }
        Ok(false) => {}
        Err(_) => panic!("RTC unreachable on boot"),
    }

    // Until the dock pushes real time, drift tracking starts from the
    // build-time calendar
    let mut true_clock = TrueClock::new(BandClock::new(rtc), CORRECTION_FACTOR);
    if true_clock.calibrate(&BOOT_CALENDAR).is_err() {
        panic!("Boot calibration failed");
    }
    info!("Boot calibration anchored at {}", BOOT_CALENDAR);

    info!("Peripherals initialized, spawning tasks");

    sync_handler::spawn(wake_sender.clone()).ok();
    reminder_task::spawn(wake_receiver).ok();

    let seed = Mono::now().ticks() as u32;

    (
        Shared { true_clock },
        Local {
            led: led_pin,
            haptic: haptic_pin,
            reminder: ReminderMachine::new(strategy, seed),
            sync_uart,
            alarm_pin,
            touch_pin,
            wake_sender,
        },
    )
}
