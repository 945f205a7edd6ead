use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use hoikudb_core::{
    filter::FilterCriteria,
    model::{AGE_CLASS_COUNT, AreaKey},
    overlay::{OverlayKind, PanelSignal},
};

use crate::app::App;

#[derive(Debug, Clone)]
pub(crate) enum Action {
    None,
    Quit,
    /// Run `session.select_area`(...) for the highlighted ward
    SelectArea(AreaKey),
    /// Run `session.reload`() for the selected area
    Reload,
}

pub(crate) fn handle_key_event(key: KeyEvent, app: &mut App) -> Action {
    use KeyCode::{Backspace, Char, Delete, Down, Enter, Esc, Left, Right, Up};

    // Global quit shortcut; plain 'q' is text inside the filter panel
    if key.code == Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }

    let mut action = Action::None;

    match app.session.overlay().kind() {
        OverlayKind::Closed => {
            let map_event = match key.code {
                Char('q') => return Action::Quit,
                Left | Char('h') => Some(app.session.bridge_mut().pan(-1.0, 0.0)),
                Right | Char('l') => Some(app.session.bridge_mut().pan(1.0, 0.0)),
                Up => Some(app.session.bridge_mut().pan(0.0, 1.0)),
                Down => Some(app.session.bridge_mut().pan(0.0, -1.0)),
                Char('+' | '=') => Some(app.session.bridge_mut().zoom(0.5)),
                Char('-') => Some(app.session.bridge_mut().zoom(2.0)),
                Char('j') => {
                    app.session.bridge_mut().move_cursor(true);
                    None
                }
                Char('k') => {
                    app.session.bridge_mut().move_cursor(false);
                    None
                }
                Enter => app.session.bridge().click_point(),
                Char('z') => app.session.bridge().click_cluster(),
                Char('w') => {
                    app.request_panel(PanelSignal::OpenWardPanel);
                    None
                }
                Char('f') => {
                    app.request_panel(PanelSignal::OpenFilterPanel);
                    None
                }
                Char('r') => {
                    action = Action::Reload;
                    None
                }
                Char('i') => {
                    app.show_source = !app.show_source;
                    None
                }
                Esc => {
                    app.error_message = None;
                    app.show_source = false;
                    None
                }
                _ => None,
            };
            if let Some(event) = map_event {
                app.session.handle_map_event(event);
            }
        }

        OverlayKind::Ward => match key.code {
            Up | Char('k') => {
                app.ward_list_index = app.ward_list_index.saturating_sub(1);
            }
            Down | Char('j') => {
                if app.ward_list_index + 1 < app.areas.len() {
                    app.ward_list_index += 1;
                }
            }
            Enter | Char(' ') => {
                if let Some(area) = app.current_area() {
                    action = Action::SelectArea(area.clone());
                }
            }
            Esc => app.session.overlay_mut().close(),
            Char('q') => return Action::Quit,
            _ => {}
        },

        OverlayKind::Filter => match key.code {
            Up => {
                app.age_list_index = app.age_list_index.saturating_sub(1);
            }
            Down => {
                if app.age_list_index + 1 < AGE_CLASS_COUNT {
                    app.age_list_index += 1;
                }
            }
            Enter => {
                let age = app.current_age();
                app.session.update_criteria(|criteria| criteria.toggle(age));
            }
            Left | Right => {
                let age = app.current_age();
                let delta = if key.code == Left { -1 } else { 1 };
                app.session
                    .update_criteria(|criteria| criteria.adjust(age, delta));
            }
            Delete => app.session.update_criteria(FilterCriteria::clear),
            Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                app.session.update_criteria(FilterCriteria::clear);
            }
            Backspace => {
                app.session.update_criteria(|criteria| {
                    criteria.name.pop();
                });
            }
            Char(character) => {
                if !key.modifiers.contains(KeyModifiers::CONTROL)
                    && !key.modifiers.contains(KeyModifiers::ALT)
                {
                    app.session
                        .update_criteria(|criteria| criteria.name.push(character));
                }
            }
            Esc => app.session.overlay_mut().close(),
            _ => {}
        },

        OverlayKind::Detail => match key.code {
            Esc | Enter | Char('q' | 'b') => app.session.overlay_mut().close(),
            _ => {}
        },
    }
    action
}
