//! GPIO / peripheral pin assignments for the CropSpray controller board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Pump relays (active HIGH)
// ---------------------------------------------------------------------------

pub const RELAY_1_GPIO: i32 = 4;
pub const RELAY_2_GPIO: i32 = 5;

/// Relay outputs indexed by zero-based pump index.
pub const RELAY_GPIOS: [i32; crate::scheduler::MAX_PUMPS] = [RELAY_1_GPIO, RELAY_2_GPIO];

// ---------------------------------------------------------------------------
// Front-panel buttons (active-low, internal pull-up)
// ---------------------------------------------------------------------------

/// Network reset.  Shares the pin the bootstrap firmware uses for Wi-Fi reset.
pub const BUTTON_RESET_GPIO: i32 = 23;
pub const BUTTON_UP_GPIO: i32 = 25;
pub const BUTTON_DOWN_GPIO: i32 = 26;
pub const BUTTON_SELECT_GPIO: i32 = 27;

/// Buttons in [`Channel`](crate::drivers::button::Channel) order.
pub const BUTTON_GPIOS: [i32; 4] = [
    BUTTON_RESET_GPIO,
    BUTTON_UP_GPIO,
    BUTTON_DOWN_GPIO,
    BUTTON_SELECT_GPIO,
];

// ---------------------------------------------------------------------------
// Feedback
// ---------------------------------------------------------------------------

pub const BUZZER_GPIO: i32 = 17;
pub const LED_OK_GPIO: i32 = 18;
pub const LED_ERROR_GPIO: i32 = 19;

// ---------------------------------------------------------------------------
// GSM modem (SIM800L on UART1)
// ---------------------------------------------------------------------------

pub const GSM_TX_GPIO: i32 = 11;
pub const GSM_RX_GPIO: i32 = 10;
/// PWRKEY: pulse LOW for 1 s to power the module on.
pub const GSM_PWRKEY_GPIO: i32 = 3;
pub const GSM_BAUD: u32 = 9600;

// ---------------------------------------------------------------------------
// I²C bus (16x2 character LCD backpack)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 21;
pub const I2C_SCL_GPIO: i32 = 22;
