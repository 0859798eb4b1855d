use serde_json::Value;

use crate::state::ClimateState;
use crate::types::*;

pub(crate) fn diff_json(
    previous: &Value,
    current: &Value,
    path_prefix: &str,
    changes: &mut Vec<(String, Value, Value)>,
) {
    match (previous, current) {
        (Value::Object(prev_map), Value::Object(curr_map)) => {
            for (key, curr_val) in curr_map {
                let path = if path_prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{path_prefix}.{key}")
                };
                match prev_map.get(key) {
                    Some(prev_val) => diff_json(prev_val, curr_val, &path, changes),
                    None => {
                        if curr_val.is_object() {
                            diff_json(&Value::Object(serde_json::Map::new()), curr_val, &path, changes);
                        } else {
                            changes.push((path, Value::Null, curr_val.clone()));
                        }
                    }
                }
            }
        }
        (prev, curr) if prev != curr => {
            changes.push((path_prefix.to_string(), prev.clone(), curr.clone()));
        }
        _ => {}
    }
}

fn map_event(path: &str, state: &ClimateState) -> Option<Event> {
    match path {
        "mode" => Some(Event::ModeChanged { mode: state.mode() }),
        "power" => Some(Event::PowerChanged {
            power: state.power(),
        }),
        "target_temperature" => Some(Event::TargetTemperatureChanged {
            temperature: state.target_temperature(),
        }),
        "fan_mode" => Some(Event::FanModeChanged {
            fan: state.fan_mode(),
        }),
        "swing_mode" => Some(Event::SwingModeChanged {
            swing: state.swing_mode(),
        }),
        "swingv" | "swingh" => Some(Event::SwingPositionChanged {
            vertical: state.swing_vertical(),
            horizontal: state.swing_horizontal(),
        }),
        "current_temperature" => state
            .current_temperature()
            .map(|temperature| Event::CurrentTemperatureChanged { temperature }),
        "current_humidity" => state
            .current_humidity()
            .map(|humidity| Event::CurrentHumidityChanged { humidity }),
        _ => {
            let toggle = Toggle::from_attribute(path.strip_prefix("toggles.")?)?;
            Some(Event::ToggleChanged {
                toggle,
                value: state.toggle(toggle).to_string(),
            })
        }
    }
}

/// Typed events for everything that differs between `previous` (a
/// [`ClimateState::to_json`] view taken before the mutation) and `current`.
pub(crate) fn state_events(previous: &Value, current: &ClimateState) -> Vec<Event> {
    let mut changes = Vec::new();
    diff_json(previous, &current.to_json(), "", &mut changes);

    let mut events: Vec<Event> = Vec::new();
    for (path, _old, _new) in &changes {
        if let Some(event) = map_event(path, current)
            && !events.contains(&event)
        {
            events.push(event);
        }
    }
    events
}
