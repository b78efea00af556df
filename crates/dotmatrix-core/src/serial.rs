use crate::interrupts::{Interrupts, Source};

pub trait LinkPort: Send {
    /// Exchange a byte over the link. Returns the byte received from the
    /// partner. Implementations may perform the transfer immediately.
    fn transfer(&mut self, byte: u8) -> u8;
}

/// A stub link port used when no cable is attached.
/// By default it emulates a "line dead" scenario where incoming bits are all
/// 1, so any transfer receives 0xFF. When `loopback` is true the sent byte is
/// echoed back instead.
#[derive(Default)]
pub struct NullLinkPort {
    loopback: bool,
}

impl NullLinkPort {
    pub fn new(loopback: bool) -> Self {
        Self { loopback }
    }
}

impl LinkPort for NullLinkPort {
    fn transfer(&mut self, byte: u8) -> u8 {
        if self.loopback { byte } else { 0xFF }
    }
}

struct Transfer {
    remaining_bits: u8,
    outgoing: u8,
    incoming: u8,
}

/// SB/SC registers. A transfer started on the internal clock shifts one bit
/// per serial slot (every 512 base clock units) and raises the Serial
/// interrupt once all eight bits have moved. Completed outgoing bytes are
/// captured for the host; test harnesses read their pass/fail output there.
pub struct Serial {
    sb: u8,
    sc: u8,
    out_buf: Vec<u8>,
    port: Box<dyn LinkPort>,
    transfer: Option<Transfer>,
}

impl Serial {
    pub fn new() -> Self {
        Self {
            sb: 0,
            sc: 0x7E,
            out_buf: Vec::new(),
            port: Box::new(NullLinkPort::default()),
            transfer: None,
        }
    }

    pub fn connect(&mut self, port: Box<dyn LinkPort>) {
        self.port = port;
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0xFF01 => self.sb,
            0xFF02 => self.sc | 0x7E,
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        match addr {
            0xFF01 => self.sb = val,
            0xFF02 => {
                self.sc = val & 0x81;
                if val & 0x80 != 0 {
                    // The partner's reply is latched up front; bits shift in
                    // over the next eight serial slots.
                    let incoming = self.port.transfer(self.sb);
                    self.transfer = Some(Transfer {
                        remaining_bits: 8,
                        outgoing: self.sb,
                        incoming,
                    });
                } else {
                    self.transfer = None;
                }
            }
            _ => {}
        }
    }

    /// One serial clock slot. Only a transfer driven by the internal clock
    /// makes progress; with an external clock and no partner the line is
    /// simply idle.
    pub fn tick(&mut self, ints: &mut Interrupts) {
        if self.sc & 0x01 == 0 {
            return;
        }
        let Some(transfer) = self.transfer.as_mut() else {
            return;
        };

        let incoming_bit = (transfer.incoming & 0x80) != 0;
        transfer.incoming <<= 1;
        self.sb = (self.sb << 1) | incoming_bit as u8;
        transfer.remaining_bits -= 1;

        if transfer.remaining_bits == 0 {
            self.out_buf.push(transfer.outgoing);
            self.transfer = None;
            self.sc &= !0x80;
            ints.request(Source::Serial);
        }
    }

    /// Drain the captured outgoing bytes.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.out_buf)
    }
}

impl Default for Serial {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{LinkPort, NullLinkPort, Serial};
    use crate::interrupts::Interrupts;

    struct FixedInLinkPort {
        ret: u8,
    }

    impl FixedInLinkPort {
        fn new(ret: u8) -> Self {
            Self { ret }
        }
    }

    impl LinkPort for FixedInLinkPort {
        fn transfer(&mut self, _byte: u8) -> u8 {
            self.ret
        }
    }

    fn slots(serial: &mut Serial, ints: &mut Interrupts, n: usize) {
        for _ in 0..n {
            serial.tick(ints);
        }
    }

    #[test]
    fn internal_clock_transfer_completes_and_requests_irq() {
        let mut serial = Serial::new();
        let mut ints = Interrupts::power_on();
        serial.connect(Box::new(FixedInLinkPort::new(0x34)));

        serial.write(0xFF01, 0x12);
        serial.write(0xFF02, 0x81);

        slots(&mut serial, &mut ints, 7);
        assert_ne!(serial.read(0xFF02) & 0x80, 0, "transfer still in flight");
        assert_eq!(ints.read_flags() & 0x08, 0);

        slots(&mut serial, &mut ints, 1);
        assert_eq!(serial.read(0xFF01), 0x34);
        assert_eq!(serial.read(0xFF02) & 0x80, 0);
        assert_ne!(ints.read_flags() & 0x08, 0);
        assert_eq!(serial.take_output(), vec![0x12]);
    }

    #[test]
    fn clearing_sc_cancels_transfer() {
        let mut serial = Serial::new();
        let mut ints = Interrupts::power_on();
        serial.connect(Box::new(FixedInLinkPort::new(0x34)));

        serial.write(0xFF01, 0x12);
        serial.write(0xFF02, 0x81);
        serial.write(0xFF02, 0x00);

        slots(&mut serial, &mut ints, 16);
        assert_eq!(ints.read_flags() & 0x08, 0);
        assert!(serial.take_output().is_empty());
    }

    #[test]
    fn external_clock_makes_no_progress() {
        let mut serial = Serial::new();
        let mut ints = Interrupts::power_on();
        serial.write(0xFF01, 0x12);
        serial.write(0xFF02, 0x80);

        slots(&mut serial, &mut ints, 64);
        assert_ne!(serial.read(0xFF02) & 0x80, 0, "no partner drives the clock");
        assert_eq!(serial.read(0xFF01), 0x12);
    }

    #[test]
    fn dead_line_shifts_in_ones() {
        let mut serial = Serial::new();
        let mut ints = Interrupts::power_on();
        serial.write(0xFF01, 0x00);
        serial.write(0xFF02, 0x81);

        slots(&mut serial, &mut ints, 8);
        assert_eq!(serial.read(0xFF01), 0xFF);
    }

    #[test]
    fn loopback_port_echoes() {
        let mut serial = Serial::new();
        let mut ints = Interrupts::power_on();
        serial.connect(Box::new(NullLinkPort::new(true)));
        serial.write(0xFF01, 0xA5);
        serial.write(0xFF02, 0x81);

        slots(&mut serial, &mut ints, 8);
        assert_eq!(serial.read(0xFF01), 0xA5);
    }
}
