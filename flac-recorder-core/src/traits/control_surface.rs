/// A controller message: parameter number and value, MIDI channel 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Control {
    pub param: u8,
    pub value: u8,
}

impl Control {
    pub const ON: u8 = 0x7f;
    pub const OFF: u8 = 0x00;

    pub fn new(param: u8, value: u8) -> Self {
        Self { param, value }
    }

    /// Light or clear a button.
    pub fn switch(button: Button, on: bool) -> Self {
        Self::new(button.param(), if on { Self::ON } else { Self::OFF })
    }

    pub fn is_release(&self) -> bool {
        self.value == Self::OFF
    }
}

/// Buttons on the pad controller. They send and accept the same parameter
/// numbers, with 0 for off/released and 127 for on/pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    NoteRepeat,
    FullLevel,
    Bank,
    Preset,
    ShowHide,
    Nudge,
    Editor,
    Shift,
    SetLoop,
    Setup,
    Up,
    Down,
    Left,
    Right,
    Select,
    Zoom,
    Click,
    Record,
    Play,
    Stop,
}

impl Button {
    pub const ALL: [Button; 20] = [
        Button::NoteRepeat,
        Button::FullLevel,
        Button::Bank,
        Button::Preset,
        Button::ShowHide,
        Button::Nudge,
        Button::Editor,
        Button::Shift,
        Button::SetLoop,
        Button::Setup,
        Button::Up,
        Button::Down,
        Button::Left,
        Button::Right,
        Button::Select,
        Button::Zoom,
        Button::Click,
        Button::Record,
        Button::Play,
        Button::Stop,
    ];

    pub fn param(self) -> u8 {
        match self {
            Button::NoteRepeat => 24,
            Button::FullLevel => 25,
            Button::Bank => 26,
            Button::Preset => 27,
            Button::ShowHide => 29,
            Button::Nudge => 30,
            Button::Editor => 31,
            Button::Shift => 32,
            Button::SetLoop => 85,
            Button::Setup => 86,
            Button::Up => 87,
            Button::Down => 89,
            Button::Left => 90,
            Button::Right => 102,
            Button::Select => 103,
            Button::Zoom => 104,
            Button::Click => 105,
            Button::Record => 107,
            Button::Play => 109,
            Button::Stop => 111,
        }
    }

    pub fn from_param(param: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.param() == param)
    }
}

/// Outgoing side of the pad controller, used only for indicator lights.
///
/// Called from the control thread. Implementations must be thread-safe.
pub trait ControlSurface: Send + Sync {
    fn send_control(&self, control: Control);
}
