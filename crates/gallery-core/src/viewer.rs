use crate::catalog::Catalog;
use crate::error::GalleryError;
use crate::filter::FilteredView;

pub const MIN_SWIPE_DISTANCE: f32 = 50.0;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Viewer {
    #[default]
    Closed,
    Open {
        index: usize,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    Previous,
    Next,
}

/// What happened to an open viewer after its view changed length.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ViewerSync {
    Unchanged,
    Clamped { index: usize },
    Closed,
}

impl Viewer {
    pub fn is_open(&self) -> bool {
        matches!(self, Viewer::Open { .. })
    }

    pub fn current_index(&self) -> Option<usize> {
        match self {
            Viewer::Open { index } => Some(*index),
            Viewer::Closed => None,
        }
    }

    pub fn open(&mut self, index: usize, len: usize) -> Result<(), GalleryError> {
        if index >= len {
            return Err(GalleryError::InvalidIndex { index, len });
        }
        *self = Viewer::Open { index };
        Ok(())
    }

    pub fn close(&mut self) -> bool {
        let was_open = self.is_open();
        *self = Viewer::Closed;
        was_open
    }

    /// Moves one step with wraparound. A closed viewer ignores the request.
    pub fn step(&mut self, direction: Direction, len: usize) -> Result<Option<usize>, GalleryError> {
        let Viewer::Open { index } = self else {
            return Ok(None);
        };
        if len == 0 {
            return Err(GalleryError::EmptyViewNavigation);
        }
        let current = (*index).min(len - 1);
        *index = match direction {
            Direction::Previous => (current + len - 1) % len,
            Direction::Next => (current + 1) % len,
        };
        Ok(Some(*index))
    }

    pub fn previous(&mut self, len: usize) -> Result<Option<usize>, GalleryError> {
        self.step(Direction::Previous, len)
    }

    pub fn next(&mut self, len: usize) -> Result<Option<usize>, GalleryError> {
        self.step(Direction::Next, len)
    }

    /// Keeps the open index inside a view that may have shrunk: the index is
    /// clamped to the last item, and an empty view closes the viewer.
    pub fn sync_len(&mut self, len: usize) -> ViewerSync {
        let Viewer::Open { index } = self else {
            return ViewerSync::Unchanged;
        };
        if len == 0 {
            *self = Viewer::Closed;
            return ViewerSync::Closed;
        }
        if *index >= len {
            *index = len - 1;
            return ViewerSync::Clamped { index: *index };
        }
        ViewerSync::Unchanged
    }

    pub fn display(&self, catalog: &Catalog, view: &FilteredView) -> Option<ViewerDisplay> {
        let index = self.current_index()?;
        let item = view.get(catalog, index)?;
        Some(ViewerDisplay {
            locator: item.locator.clone(),
            label: item.label.clone(),
            index,
            len: view.len(),
            counter: position_counter(index, view.len()),
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ViewerDisplay {
    pub locator: String,
    pub label: String,
    pub index: usize,
    pub len: usize,
    pub counter: String,
}

pub fn position_counter(index: usize, len: usize) -> String {
    format!("{} / {}", index + 1, len)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Key {
    Escape,
    ArrowLeft,
    ArrowRight,
    Other,
}

impl Key {
    pub fn parse(name: &str) -> Self {
        match name {
            "Escape" | "Esc" => Key::Escape,
            "ArrowLeft" | "Left" => Key::ArrowLeft,
            "ArrowRight" | "Right" => Key::ArrowRight,
            _ => Key::Other,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ViewerInput {
    BackgroundClick,
    CloseButton,
    PrevButton,
    NextButton,
    Key(Key),
    Swipe { dx: f32, dy: f32 },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ViewerCommand {
    Close,
    Step(Direction),
}

impl ViewerInput {
    pub fn command(self) -> Option<ViewerCommand> {
        match self {
            ViewerInput::BackgroundClick
            | ViewerInput::CloseButton
            | ViewerInput::Key(Key::Escape) => Some(ViewerCommand::Close),
            ViewerInput::PrevButton | ViewerInput::Key(Key::ArrowLeft) => {
                Some(ViewerCommand::Step(Direction::Previous))
            }
            ViewerInput::NextButton | ViewerInput::Key(Key::ArrowRight) => {
                Some(ViewerCommand::Step(Direction::Next))
            }
            ViewerInput::Key(Key::Other) => None,
            ViewerInput::Swipe { dx, dy } => swipe_direction(dx, dy).map(ViewerCommand::Step),
        }
    }
}

/// Horizontal swipes past the threshold navigate; a rightward swipe goes back.
pub fn swipe_direction(dx: f32, dy: f32) -> Option<Direction> {
    if !dx.is_finite() || !dy.is_finite() {
        return None;
    }
    if dx.abs() <= dy.abs() || dx.abs() <= MIN_SWIPE_DISTANCE {
        return None;
    }
    if dx > 0.0 {
        Some(Direction::Previous)
    } else {
        Some(Direction::Next)
    }
}
