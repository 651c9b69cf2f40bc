#![no_std]
#![no_main]

mod sys;

use defmt::info;
use embassy_executor::Spawner;
use embassy_rp::gpio::Flex;
use embassy_time::{Duration, Instant, Timer};

use mcu_console::{registry, transport_usb, Dispatcher, SystemScheduler};

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    sys::init();

    let p = embassy_rp::init(Default::default());

    // Command link over USB CDC-ACM.
    let mut console = transport_usb::init::<256>(&spawner, p.USB);

    // Four example GPIOs addressable from `set_digital_out`/`get_digital_in`.
    let pins = [Flex::new(p.PIN_2), Flex::new(p.PIN_3), Flex::new(p.PIN_4), Flex::new(p.PIN_5)];
    let mut pins = mcu_console::pins_rp2040::GpioPins::new(pins);

    let mut scheduler = SystemScheduler::new();
    let mut dispatcher = Dispatcher::new();

    info!("command link ready");

    loop {
        console.pump();
        dispatcher.set_uptime_millis(Instant::now().as_millis() as u32);
        dispatcher.tick(&mut console, &mut scheduler, &mut pins, &registry::COMMAND_INDEX);
        console.flush();
        Timer::after(Duration::from_micros(500)).await;
    }
}
