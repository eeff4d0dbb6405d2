//! Internal constants, peripheral offsets, register indices and bit definitions.

/// Size of one mapped register window.
pub const PAGE_SIZE: usize = 4096;

// --- Board / Peripheral Base ---
pub mod board {
    /// Peripheral base of the BCM2835 (Pi 1, Pi Zero).
    pub const PERIPHERAL_BASE_BCM2835: u64 = 0x2000_0000;
    /// Peripheral base of the BCM2836/BCM2837 (Pi 2, Pi 3).
    pub const PERIPHERAL_BASE_BCM2837: u64 = 0x3F00_0000;
    /// I2C buses exposed on the header by default.
    pub const DEFAULT_I2C_BUSES: std::ops::RangeInclusive<u8> = 0..=1;
}

// --- GPIO Block ---
pub mod gpio {
    /// Offset of the GPIO block from the peripheral base.
    pub const OFFSET: u64 = 0x0020_0000;
    /// `/dev/gpiomem` needs no root; `/dev/mem` is the fallback.
    pub const DEVICES: &[&str] = &["/dev/gpiomem", "/dev/mem"];

    // Register word indices (u32 offsets into the window)
    pub const REG_FSEL0: usize = 0; // GPFSEL0..GPFSEL5 = 0..5
    pub const REG_SET0: usize = 7;
    pub const REG_CLR0: usize = 10;
    pub const REG_LEV0: usize = 13;
    pub const REG_PUD: usize = 37;
    pub const REG_PUDCLK0: usize = 38;

    /// Pins addressable through the function-select words.
    pub const ADDRESSABLE_PINS: u8 = 54;
    /// Pins reachable through a single 32-bit set/clear/level word.
    pub const BANK0_PINS: u8 = 32;
    /// Setup/hold time for the pull-up/down latch.
    pub const PULL_SETTLE_US: u64 = 10;
}

// --- Clock Manager Block ---
pub mod clock {
    /// Offset of the clock manager block from the peripheral base.
    pub const OFFSET: u64 = 0x0010_1000;
    /// Clock and PWM registers are only reachable through `/dev/mem`.
    pub const DEVICES: &[&str] = &["/dev/mem"];

    pub const REG_PWM_CTL: usize = 40; // CM_PWMCTL
    pub const REG_PWM_DIV: usize = 41; // CM_PWMDIV

    /// Required in the top byte of every clock manager write.
    pub const PASSWORD: u32 = 0x5A00_0000;
    pub const PASSWORD_MASK: u32 = 0xFF00_0000;

    /// PLLD (500 MHz) / 2 = 250 MHz PWM clock.
    pub const PWM_CLOCK_DIVI: u32 = 2;
    pub const SETTLE_US: u64 = 10;

    // Prescaler math for 12-bit counters fed by a 25 MHz oscillator
    pub const PRESCALE_OSCILLATOR_HZ: u32 = 25_000_000;
    pub const PRESCALE_STEPS: u32 = 4096;
    pub const PRESCALE_MAX: u32 = 0xFFF;
}

// --- PWM Block ---
pub mod pwm {
    /// Offset of the PWM block from the peripheral base.
    pub const OFFSET: u64 = 0x0020_C000;

    pub const REG_CTL: usize = 0;
    pub const REG_RNG1: usize = 4;
    pub const REG_DAT1: usize = 5;
    pub const REG_RNG2: usize = 8;
    pub const REG_DAT2: usize = 9;

    /// One counter tick at 250 MHz.
    pub const TICK_NS: f64 = 4.0;
    pub const CHANNEL_COUNT: usize = 2;
}

// --- I2C / SMBus (linux/i2c-dev.h, linux/i2c.h) ---
pub mod i2c {
    pub const DEVICE_PREFIX: &str = "/dev/i2c-";

    // ioctl request numbers
    pub const I2C_SLAVE_FORCE: u32 = 0x0706;
    pub const I2C_RDWR: u32 = 0x0707;
    pub const I2C_SMBUS: u32 = 0x0720;

    // i2c_msg flags
    pub const I2C_M_RD: u16 = 0x0001;

    // i2c_smbus_ioctl_data.read_write
    pub const SMBUS_WRITE: u8 = 0;
    pub const SMBUS_READ: u8 = 1;

    // i2c_smbus_ioctl_data.size
    pub const SMBUS_QUICK: u32 = 0;
    pub const SMBUS_BYTE: u32 = 1;
    pub const SMBUS_BYTE_DATA: u32 = 2;
    pub const SMBUS_WORD_DATA: u32 = 3;
    pub const SMBUS_BLOCK_DATA: u32 = 5;

    /// Largest SMBus block payload.
    pub const SMBUS_BLOCK_MAX: usize = 32;
    /// `union i2c_smbus_data`: length byte + block + one byte PEC slack.
    pub const SMBUS_BUFFER_SIZE: usize = SMBUS_BLOCK_MAX + 2;

    pub const MAX_7BIT_ADDRESS: u8 = 0x7F;
    // Scan range skipping the reserved addresses at both ends
    pub const SCAN_FIRST: u8 = 0x08;
    pub const SCAN_LAST: u8 = 0x77;
}
