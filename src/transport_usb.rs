//! USB CDC-ACM transport adapter implementing the [`Console`] byte-queue
//! interface over a virtual serial port.

use embassy_executor::Spawner;
use embassy_futures::select::{select, Either};
use embassy_rp::bind_interrupts;
use embassy_rp::peripherals::USB;
use embassy_rp::usb::{Driver, InterruptHandler};
use embassy_rp::Peri;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_usb::class::cdc_acm::{CdcAcmClass, State};
use embassy_usb::UsbDevice;
use heapless::Vec;
use static_cell::StaticCell;

use crate::console::{drop_front, Console};

bind_interrupts!(struct Irqs {
    USBCTRL_IRQ => InterruptHandler<USB>;
});

type MyUsbDriver = Driver<'static, USB>;
type MyUsbDevice = UsbDevice<'static, MyUsbDriver>;

static TX_TO_USB: Channel<CriticalSectionRawMutex, Vec<u8, 64>, 8> = Channel::new();
static RX_FROM_USB: Channel<CriticalSectionRawMutex, Vec<u8, 64>, 8> = Channel::new();

/// A [`Console`] fed by a background USB task. `pump`/`flush` never
/// suspend, so the dispatcher's main loop stays non-blocking: inbound
/// packets already sitting in the channel are drained into the input
/// queue, and whatever got committed since the last flush is handed off in
/// 64-byte chunks.
pub struct UsbConsole<const N: usize> {
    input: heapless::Vec<u8, N>,
    scratch: heapless::Vec<u8, N>,
    sent: heapless::Vec<u8, N>,
}

impl<const N: usize> UsbConsole<N> {
    const fn new() -> Self {
        Self { input: heapless::Vec::new(), scratch: heapless::Vec::new(), sent: heapless::Vec::new() }
    }

    /// Drain whatever the background USB task has already received.
    pub fn pump(&mut self) {
        while let Ok(pkt) = RX_FROM_USB.try_receive() {
            if self.input.extend_from_slice(&pkt).is_err() {
                defmt::warn!("usb console input overflow, dropping buffered bytes");
                self.input.clear();
                let _ = self.input.extend_from_slice(&pkt);
            }
        }
    }

    /// Hand off everything committed since the last flush to the
    /// background USB task, chunked to the CDC packet size.
    pub fn flush(&mut self) {
        for chunk in self.sent.chunks(64) {
            let mut v = Vec::<u8, 64>::new();
            let _ = v.extend_from_slice(chunk);
            if TX_TO_USB.try_send(v).is_err() {
                defmt::warn!("usb console tx full, dropping outbound chunk");
            }
        }
        self.sent.clear();
    }
}

impl<const N: usize> Console for UsbConsole<N> {
    fn input_peek(&self) -> &[u8] {
        &self.input
    }

    fn input_pop(&mut self, n: usize) {
        drop_front(&mut self.input, n);
    }

    fn output_reserve(&mut self, n: usize) -> Option<&mut [u8]> {
        self.scratch.clear();
        self.scratch.resize(n, 0).ok()?;
        Some(&mut self.scratch[..n])
    }

    fn output_commit(&mut self, n: usize) {
        let _ = self.sent.extend_from_slice(&self.scratch[..n]);
    }
}

/// Bring up the USB device and CDC class, spawning the background tasks
/// that service the wire, and return the [`Console`] the dispatcher drives.
pub fn init<const N: usize>(spawner: &Spawner, usb_peripheral: Peri<'static, USB>) -> UsbConsole<N> {
    let driver = Driver::new(usb_peripheral, Irqs);

    let config = {
        let mut config = embassy_usb::Config::new(0xc0de, 0xcafe);
        config.manufacturer = Some("mcu-console");
        config.product = Some("command link");
        config.serial_number = Some("00000001");
        config.max_power = 100;
        config.max_packet_size_0 = 64;
        config
    };

    static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
    static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
    static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();

    let mut builder = embassy_usb::Builder::new(
        driver,
        config,
        CONFIG_DESCRIPTOR.init([0; 256]),
        BOS_DESCRIPTOR.init([0; 256]),
        &mut [],
        CONTROL_BUF.init([0; 64]),
    );

    static STATE: StaticCell<State> = StaticCell::new();
    let state = STATE.init(State::new());
    let class = CdcAcmClass::new(&mut builder, state, 64);

    let usb = builder.build();

    spawner.must_spawn(usb_task(usb));
    spawner.must_spawn(cdc_task(class));

    UsbConsole::new()
}

#[embassy_executor::task]
async fn usb_task(mut usb: MyUsbDevice) -> ! {
    usb.run().await
}

#[embassy_executor::task]
async fn cdc_task(mut class: CdcAcmClass<'static, MyUsbDriver>) -> ! {
    let mut buf = [0u8; 64];

    loop {
        class.wait_connection().await;
        loop {
            match select(class.read_packet(&mut buf), TX_TO_USB.receive()).await {
                Either::First(Ok(n)) => {
                    let mut v = Vec::<u8, 64>::new();
                    let _ = v.extend_from_slice(&buf[..n]);
                    let _ = RX_FROM_USB.try_send(v);
                }
                Either::First(Err(_)) => break,
                Either::Second(out) => {
                    if class.write_packet(&out).await.is_err() {
                        break;
                    }
                }
            }
        }
    }
}
