//! Event translation between the modern and legacy event shapes
//!
//! The translator is a pure function: it never touches the queue
//! itself. For each incoming event it produces the events to inject
//! ahead of it, the (possibly rewritten) event itself, and a
//! directive to discard any already-queued resize. [`EventQueue`]
//! applies those results, including the expose deduplication.
//!
//! The legacy and modern shapes are distinct types and fields are
//! copied member by member; no layout compatibility between the two
//! wheel shapes is assumed.

use std::collections::VecDeque;

use bitflags::bitflags;

bitflags! {
    /// Keyboard modifier state accompanying key events.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct KeyMods: u8 {
        /// Either shift key held.
        const SHIFT = 1 << 0;
        /// Caps lock engaged.
        const CAPS  = 1 << 1;
        /// Either control key held.
        const CTRL  = 1 << 2;
        /// Either alt key held.
        const ALT   = 1 << 3;
    }
}

bitflags! {
    /// Reason bitmask carried by legacy activation events.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AppState: u8 {
        /// Application is visible (not minimized).
        const ACTIVE      = 1 << 0;
        /// Application has keyboard focus.
        const INPUT_FOCUS = 1 << 1;
        /// Pointer is inside the window.
        const MOUSE_FOCUS = 1 << 2;
    }
}

/// Legacy button id synthesized for an upward wheel tick.
pub const BUTTON_WHEEL_UP: u8 = 4;
/// Legacy button id synthesized for a downward wheel tick.
pub const BUTTON_WHEEL_DOWN: u8 = 5;

/// Window-manager notifications in the modern vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    /// Window contents need repainting.
    Exposed,
    /// Window client area changed size.
    Resized {
        /// New width in pixels
        w: u32,
        /// New height in pixels
        h: u32,
    },
    /// Window was minimized.
    Minimized,
    /// Window was restored from minimized state.
    Restored,
    /// Pointer entered the window.
    Enter,
    /// Pointer left the window.
    Leave,
    /// Window gained keyboard focus.
    FocusGained,
    /// Window lost keyboard focus.
    FocusLost,
    /// The user asked the window to close.
    Close,
}

/// An event as produced by the modern windowing backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Window-manager notification.
    Window(WindowEvent),
    /// Key pressed.
    KeyDown {
        /// Key code (ASCII-compatible below 256)
        sym: u32,
        /// Modifier state at the time of the press
        mods: KeyMods,
    },
    /// Key released.
    KeyUp {
        /// Key code
        sym: u32,
        /// Modifier state at the time of the release
        mods: KeyMods,
    },
    /// Pointer motion in window coordinates.
    MouseMotion {
        /// Pointer x
        x: i32,
        /// Pointer y
        y: i32,
        /// Relative x motion
        xrel: i32,
        /// Relative y motion
        yrel: i32,
    },
    /// Pointer button press or release in window coordinates.
    MouseButton {
        /// Button index
        button: u8,
        /// True for press, false for release
        pressed: bool,
        /// Pointer x
        x: i32,
        /// Pointer y
        y: i32,
    },
    /// Scroll wheel motion with both axes.
    Wheel {
        /// Horizontal delta, positive to the right
        dx: i32,
        /// Vertical delta, positive away from the user
        dy: i32,
    },
}

/// An event in the shape legacy applications expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompatEvent {
    /// Window-manager notification passed through unmodified.
    Window(WindowEvent),
    /// The screen needs repainting.
    VideoExpose,
    /// The logical video surface should be recreated at a new size.
    VideoResize {
        /// New width
        w: u32,
        /// New height
        h: u32,
    },
    /// Application activation change.
    Active {
        /// True when the state was gained
        gain: bool,
        /// Which activation states changed
        state: AppState,
    },
    /// The application should quit.
    Quit,
    /// Key press with the synthesized character value.
    KeyDown {
        /// Key code
        sym: u32,
        /// Synthesized character, 0 if none
        unicode: u32,
    },
    /// Key release.
    KeyUp {
        /// Key code
        sym: u32,
    },
    /// Pointer motion relative to the logical surface.
    MouseMotion {
        /// Pointer x
        x: i32,
        /// Pointer y
        y: i32,
        /// Relative x motion
        xrel: i32,
        /// Relative y motion
        yrel: i32,
    },
    /// Pointer button relative to the logical surface.
    MouseButton {
        /// Button index
        button: u8,
        /// True for press
        pressed: bool,
        /// Pointer x
        x: i32,
        /// Pointer y
        y: i32,
    },
    /// Legacy two-field wheel event.
    Wheel {
        /// Horizontal delta
        x: i32,
        /// Vertical delta
        y: i32,
    },
}

/// Discriminant used for queue queries and flushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompatEventKind {
    /// [`CompatEvent::Window`]
    Window,
    /// [`CompatEvent::VideoExpose`]
    VideoExpose,
    /// [`CompatEvent::VideoResize`]
    VideoResize,
    /// [`CompatEvent::Active`]
    Active,
    /// [`CompatEvent::Quit`]
    Quit,
    /// [`CompatEvent::KeyDown`]
    KeyDown,
    /// [`CompatEvent::KeyUp`]
    KeyUp,
    /// [`CompatEvent::MouseMotion`]
    MouseMotion,
    /// [`CompatEvent::MouseButton`]
    MouseButton,
    /// [`CompatEvent::Wheel`]
    Wheel,
}

impl CompatEvent {
    /// Discriminant of this event.
    #[must_use]
    pub fn kind(&self) -> CompatEventKind {
        match self {
            Self::Window(_) => CompatEventKind::Window,
            Self::VideoExpose => CompatEventKind::VideoExpose,
            Self::VideoResize { .. } => CompatEventKind::VideoResize,
            Self::Active { .. } => CompatEventKind::Active,
            Self::Quit => CompatEventKind::Quit,
            Self::KeyDown { .. } => CompatEventKind::KeyDown,
            Self::KeyUp { .. } => CompatEventKind::KeyUp,
            Self::MouseMotion { .. } => CompatEventKind::MouseMotion,
            Self::MouseButton { .. } => CompatEventKind::MouseButton,
            Self::Wheel { .. } => CompatEventKind::Wheel,
        }
    }

    /// Shape an event for delivery without any translation applied
    /// (used when no filter is installed).
    #[must_use]
    pub fn passthrough(event: &Event) -> Self {
        match *event {
            Event::Window(we) => Self::Window(we),
            Event::KeyDown { sym, .. } => Self::KeyDown { sym, unicode: 0 },
            Event::KeyUp { sym, .. } => Self::KeyUp { sym },
            Event::MouseMotion { x, y, xrel, yrel } => Self::MouseMotion { x, y, xrel, yrel },
            Event::MouseButton {
                button,
                pressed,
                x,
                y,
            } => Self::MouseButton {
                button,
                pressed,
                x,
                y,
            },
            Event::Wheel { dx, dy } => Self::Wheel { x: dx, y: dy },
        }
    }
}

/// Session state the translator needs to consult.
#[derive(Debug, Clone, Copy, Default)]
pub struct TranslateContext {
    /// Active centering viewport offset.
    pub viewport: (i32, i32),
    /// Whether the window is currently fullscreen (suppresses resize
    /// synthesis to hide letterboxing).
    pub fullscreen: bool,
    /// Current pointer position, used for synthesized wheel buttons.
    pub pointer: (i32, i32),
}

/// Result of translating one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    /// Any already-queued resize must be discarded before this
    /// translation is applied.
    pub discard_pending_resize: bool,
    /// Events to enqueue ahead of the translated event.
    pub injected: Vec<CompatEvent>,
    /// The original event, possibly rewritten into a legacy shape.
    pub event: CompatEvent,
}

impl Translation {
    fn passthrough(event: &Event) -> Self {
        Self {
            discard_pending_resize: false,
            injected: Vec::new(),
            event: CompatEvent::passthrough(event),
        }
    }

    fn inject(event: &Event, injected: Vec<CompatEvent>) -> Self {
        Self {
            discard_pending_resize: false,
            injected,
            event: CompatEvent::passthrough(event),
        }
    }
}

/// Translate one modern event into its legacy delivery.
///
/// Never suppresses the original event; it only injects synthesized
/// events ahead of it and rewrites fields into legacy shapes.
#[must_use]
pub fn translate(event: &Event, ctx: &TranslateContext) -> Translation {
    match *event {
        Event::Window(we) => translate_window(event, we, ctx),
        Event::KeyDown { sym, mods } => Translation {
            discard_pending_resize: false,
            injected: Vec::new(),
            event: CompatEvent::KeyDown {
                sym,
                unicode: synthesize_unicode(sym, mods),
            },
        },
        Event::KeyUp { sym, .. } => Translation {
            discard_pending_resize: false,
            injected: Vec::new(),
            event: CompatEvent::KeyUp { sym },
        },
        Event::MouseMotion { x, y, xrel, yrel } => Translation {
            discard_pending_resize: false,
            injected: Vec::new(),
            event: CompatEvent::MouseMotion {
                x: x - ctx.viewport.0,
                y: y - ctx.viewport.1,
                xrel,
                yrel,
            },
        },
        Event::MouseButton {
            button,
            pressed,
            x,
            y,
        } => Translation {
            discard_pending_resize: false,
            injected: Vec::new(),
            event: CompatEvent::MouseButton {
                button,
                pressed,
                x: x - ctx.viewport.0,
                y: y - ctx.viewport.1,
            },
        },
        Event::Wheel { dx, dy } => translate_wheel(dx, dy, ctx),
    }
}

fn translate_window(event: &Event, we: WindowEvent, ctx: &TranslateContext) -> Translation {
    match we {
        WindowEvent::Exposed => Translation::inject(event, vec![CompatEvent::VideoExpose]),
        WindowEvent::Resized { w, h } => {
            // The window's real size is hidden while fullscreen so a
            // denied mode does not leak letterbox dimensions.
            let injected = if ctx.fullscreen {
                Vec::new()
            } else {
                vec![CompatEvent::VideoResize { w, h }]
            };
            Translation {
                discard_pending_resize: true,
                injected,
                event: CompatEvent::passthrough(event),
            }
        }
        WindowEvent::Minimized => Translation::inject(
            event,
            vec![CompatEvent::Active {
                gain: false,
                state: AppState::ACTIVE,
            }],
        ),
        WindowEvent::Restored => Translation::inject(
            event,
            vec![CompatEvent::Active {
                gain: true,
                state: AppState::ACTIVE,
            }],
        ),
        WindowEvent::Enter => Translation::inject(
            event,
            vec![CompatEvent::Active {
                gain: true,
                state: AppState::MOUSE_FOCUS,
            }],
        ),
        WindowEvent::Leave => Translation::inject(
            event,
            vec![CompatEvent::Active {
                gain: false,
                state: AppState::MOUSE_FOCUS,
            }],
        ),
        WindowEvent::FocusGained => Translation::inject(
            event,
            vec![CompatEvent::Active {
                gain: true,
                state: AppState::INPUT_FOCUS,
            }],
        ),
        WindowEvent::FocusLost => Translation::inject(
            event,
            vec![CompatEvent::Active {
                gain: false,
                state: AppState::INPUT_FOCUS,
            }],
        ),
        WindowEvent::Close => Translation::inject(event, vec![CompatEvent::Quit]),
    }
}

fn translate_wheel(dx: i32, dy: i32, ctx: &TranslateContext) -> Translation {
    // A purely horizontal tick has no legacy equivalent; deliver the
    // rewritten shape without synthesizing buttons.
    if dy == 0 {
        return Translation {
            discard_pending_resize: false,
            injected: Vec::new(),
            event: CompatEvent::Wheel { x: dx, y: dy },
        };
    }
    let button = if dy > 0 {
        BUTTON_WHEEL_UP
    } else {
        BUTTON_WHEEL_DOWN
    };
    let (px, py) = ctx.pointer;
    Translation {
        discard_pending_resize: false,
        injected: vec![
            CompatEvent::MouseButton {
                button,
                pressed: true,
                x: px,
                y: py,
            },
            CompatEvent::MouseButton {
                button,
                pressed: false,
                x: px,
                y: py,
            },
        ],
        event: CompatEvent::Wheel { x: dx, y: dy },
    }
}

fn synthesize_unicode(sym: u32, mods: KeyMods) -> u32 {
    if sym >= 256 {
        return 0;
    }
    let mut unicode = sym;
    if (b'a'..=b'z').contains(&(sym as u8)) {
        let shifted = mods.contains(KeyMods::SHIFT);
        let capslock = mods.contains(KeyMods::CAPS);
        if shifted ^ capslock {
            unicode = u32::from((sym as u8).to_ascii_uppercase());
        }
    }
    unicode
}

/// FIFO of legacy-shaped events with the query/flush operations the
/// translator's directives need.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<CompatEvent>,
}

impl EventQueue {
    /// Empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn push(&mut self, event: CompatEvent) {
        self.events.push_back(event);
    }

    /// Pop the oldest event.
    pub fn poll(&mut self) -> Option<CompatEvent> {
        self.events.pop_front()
    }

    /// Whether an event of `kind` is pending.
    #[must_use]
    pub fn has(&self, kind: CompatEventKind) -> bool {
        self.events.iter().any(|e| e.kind() == kind)
    }

    /// Remove every pending event of `kind`.
    pub fn flush(&mut self, kind: CompatEventKind) {
        self.events.retain(|e| e.kind() != kind);
    }

    /// Number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Apply one translation: discard stale resizes, inject the
    /// synthesized events (deduplicating exposures), then enqueue the
    /// translated original.
    pub fn apply(&mut self, translation: Translation) {
        if translation.discard_pending_resize {
            self.flush(CompatEventKind::VideoResize);
        }
        for event in translation.injected {
            if event.kind() == CompatEventKind::VideoExpose
                && self.has(CompatEventKind::VideoExpose)
            {
                continue;
            }
            self.push(event);
        }
        self.push(translation.event);
    }
}
