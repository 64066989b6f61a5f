//! Commands that flip the control flags.
//!
//! Switch presses and serial bytes arrive in interrupt context. They are
//! turned into [`Command`]s and posted to a [`CommandQueue`]; the
//! [`CommandListener`] task is the only place that applies them to the
//! shared state.

use embassy_futures::select::{Either, select};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};

use crate::dispatcher::StopSignal;
use crate::state::ControlWriter;

/// Commands that can wait in the queue before new ones are dropped.
pub const COMMAND_QUEUE_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Start or stop sampling.
    ToggleMeasurement,
    /// Freeze or unfreeze the reported value.
    ToggleHold,
}

impl Command {
    /// Decodes a serial command byte.
    ///
    /// `O` toggles measurement and `H` toggles hold. Anything else is not a
    /// command and is ignored by the callers.
    pub fn from_byte(byte: u8) -> Option<Command> {
        match byte {
            b'O' => Some(Command::ToggleMeasurement),
            b'H' => Some(Command::ToggleHold),
            _ => None,
        }
    }
}

/// The two switches on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Switch {
    One,
    Two,
}

impl Switch {
    pub const ALL: [Switch; 2] = [Switch::One, Switch::Two];

    /// The bit of this switch in a [`SwitchMask`].
    pub const fn bit(self) -> u8 {
        match self {
            Switch::One => 1 << 0,
            Switch::Two => 1 << 1,
        }
    }

    /// Switch 1 does what `O` does, switch 2 does what `H` does.
    pub const fn command(self) -> Command {
        match self {
            Switch::One => Command::ToggleMeasurement,
            Switch::Two => Command::ToggleHold,
        }
    }
}

/// Pressed switches, one bit per switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SwitchMask(pub u8);

impl SwitchMask {
    pub const NONE: SwitchMask = SwitchMask(0);

    pub fn is_pressed(self, switch: Switch) -> bool {
        self.0 & switch.bit() != 0
    }

    pub fn with(self, switch: Switch) -> SwitchMask {
        SwitchMask(self.0 | switch.bit())
    }

    /// The commands of every pressed switch, switch 1 first.
    pub fn commands(self) -> impl Iterator<Item = Command> {
        Switch::ALL
            .into_iter()
            .filter(move |switch| self.is_pressed(*switch))
            .map(Switch::command)
    }
}

/// Bounded queue between interrupt handlers and the command listener.
pub struct CommandQueue {
    channel: Channel<CriticalSectionRawMutex, Command, COMMAND_QUEUE_DEPTH>,
}

impl CommandQueue {
    pub const fn new() -> Self {
        CommandQueue {
            channel: Channel::new(),
        }
    }

    /// Queues a command without blocking. Returns `false` if the queue was
    /// full and the command was dropped.
    pub fn post(&self, command: Command) -> bool {
        match self.channel.try_send(command) {
            Ok(()) => true,
            Err(_) => {
                warn!("command queue full, dropping {}", command);
                false
            }
        }
    }

    /// Queues the command encoded by a serial byte. Bytes that are not
    /// commands are ignored.
    pub fn post_byte(&self, byte: u8) {
        match Command::from_byte(byte) {
            Some(command) => {
                self.post(command);
            }
            None => debug!("ignoring serial byte {=u8:#x}", byte),
        }
    }

    /// Queues the commands of every pressed switch.
    pub fn post_switches(&self, mask: SwitchMask) {
        for command in mask.commands() {
            self.post(command);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    async fn receive(&self) -> Command {
        self.channel.receive().await
    }

    fn try_receive(&self) -> Option<Command> {
        self.channel.try_receive().ok()
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies queued commands to the control flags.
pub struct CommandListener<'a> {
    queue: &'a CommandQueue,
    control: ControlWriter<'a>,
}

impl<'a> CommandListener<'a> {
    pub fn new(queue: &'a CommandQueue, control: ControlWriter<'a>) -> Self {
        CommandListener { queue, control }
    }

    /// Waits for one command and applies it.
    pub async fn step(&mut self) -> Command {
        let command = self.queue.receive().await;
        self.apply(command);
        command
    }

    /// Applies every command already queued and returns how many there
    /// were.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Some(command) = self.queue.try_receive() {
            self.apply(command);
            applied += 1;
        }
        applied
    }

    pub async fn run(mut self, stop: &StopSignal) {
        loop {
            match select(self.queue.receive(), stop.wait()).await {
                Either::First(command) => self.apply(command),
                Either::Second(()) => break,
            }
        }
    }

    fn apply(&mut self, command: Command) {
        let enabled = self.control.apply(command);
        match command {
            Command::ToggleMeasurement => info!("measurement {}", on_off(enabled)),
            Command::ToggleHold => info!("hold {}", on_off(enabled)),
        }
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}
