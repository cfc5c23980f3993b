//! Client-side application state.
//!
//! Every UI interaction is an [`Event`] applied to an [`AppState`], producing
//! the next state. Nothing else mutates the state.

use serde::{Deserialize, Serialize};

use crate::CropCategory;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Page {
    #[default]
    Dashboard,
    History,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppState {
    pub user: Option<String>,
    pub page: Page,
    pub crop_choice: Option<CropCategory>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    LoggedIn(String),
    LoggedOut,
    Navigate(Page),
    SelectCrop(CropCategory),
    BackToCropSelection,
}

impl AppState {
    pub fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }

    pub fn apply(self, event: Event) -> Self {
        match event {
            Event::LoggedIn(email) => AppState {
                user: Some(email),
                page: Page::Dashboard,
                crop_choice: self.crop_choice,
            },
            Event::LoggedOut => AppState::default(),
            // Everything below requires a session.
            _ if !self.is_logged_in() => self,
            Event::Navigate(page) => AppState { page, ..self },
            Event::SelectCrop(crop) => AppState {
                page: Page::Dashboard,
                crop_choice: Some(crop),
                ..self
            },
            Event::BackToCropSelection => AppState {
                crop_choice: None,
                ..self
            },
        }
    }
}
