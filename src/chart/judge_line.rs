use serde::{Deserialize, Serialize};

use super::event::{AnyEvent, Color, Event};
use super::note::Note;
use crate::error::{ChartError, ChartResult};

/// UI element a judge line can stand in for.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum AttachUi {
    #[default]
    None,
    Combo,
    ComboNumber,
    Score,
    Name,
    Level,
    Pause,
    Bar,
}

impl AttachUi {
    pub const FREE_FLOATING: [AttachUi; 7] = [
        AttachUi::Combo,
        AttachUi::ComboNumber,
        AttachUi::Score,
        AttachUi::Name,
        AttachUi::Level,
        AttachUi::Pause,
        AttachUi::Bar,
    ];
}

/// Five additive animation tracks.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct EventLayer {
    #[serde(default)]
    pub move_x: Vec<Event<f64>>,
    #[serde(default)]
    pub move_y: Vec<Event<f64>>,
    #[serde(default)]
    pub rotate: Vec<Event<f64>>,
    #[serde(default)]
    pub alpha: Vec<Event<f64>>,
    #[serde(default)]
    pub speed: Vec<Event<f64>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct Extended {
    #[serde(default)]
    pub scale_x: Vec<Event<f64>>,
    #[serde(default)]
    pub scale_y: Vec<Event<f64>>,
    #[serde(default)]
    pub color: Vec<Event<Color>>,
    #[serde(default)]
    pub paint: Vec<Event<f64>>,
    #[serde(default)]
    pub text: Vec<Event<String>>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayerChannel {
    MoveX,
    MoveY,
    Rotate,
    Alpha,
    Speed,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExtendedChannel {
    ScaleX,
    ScaleY,
    Color,
    Paint,
    Text,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventChannel {
    Layer { layer: usize, channel: LayerChannel },
    Extended(ExtendedChannel),
}

impl EventChannel {
    pub fn name(&self) -> &'static str {
        match self {
            EventChannel::Layer { channel, .. } => match channel {
                LayerChannel::MoveX => "move_x",
                LayerChannel::MoveY => "move_y",
                LayerChannel::Rotate => "rotate",
                LayerChannel::Alpha => "alpha",
                LayerChannel::Speed => "speed",
            },
            EventChannel::Extended(channel) => match channel {
                ExtendedChannel::ScaleX => "scale_x",
                ExtendedChannel::ScaleY => "scale_y",
                ExtendedChannel::Color => "color",
                ExtendedChannel::Paint => "paint",
                ExtendedChannel::Text => "text",
            },
        }
    }
}

/// Address of one event sequence in the chart.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EventTarget {
    pub line: usize,
    pub channel: EventChannel,
}

impl EventTarget {
    pub fn layer(line: usize, layer: usize, channel: LayerChannel) -> Self {
        EventTarget {
            line,
            channel: EventChannel::Layer { layer, channel },
        }
    }

    pub fn extended(line: usize, channel: ExtendedChannel) -> Self {
        EventTarget {
            line,
            channel: EventChannel::Extended(channel),
        }
    }
}

fn no_father() -> i32 {
    -1
}

fn centered_anchor() -> [f64; 2] {
    [0.5, 0.5]
}

fn single_layer() -> Vec<EventLayer> {
    vec![EventLayer::default()]
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct JudgeLine {
    #[serde(default)]
    pub name: String,
    /// Index of the parent line, `-1` for none.
    #[serde(default = "no_father")]
    pub father: i32,
    #[serde(default)]
    pub z_order: i32,
    #[serde(default)]
    pub attach_ui: AttachUi,
    #[serde(default = "centered_anchor")]
    pub anchor: [f64; 2],
    #[serde(default)]
    pub texture: Option<String>,
    #[serde(default)]
    pub is_cover: bool,
    #[serde(default = "single_layer")]
    pub layers: Vec<EventLayer>,
    #[serde(default)]
    pub extended: Extended,
    #[serde(default)]
    pub notes: Vec<Note>,
}

impl Default for JudgeLine {
    fn default() -> Self {
        JudgeLine {
            name: String::new(),
            father: -1,
            z_order: 0,
            attach_ui: AttachUi::None,
            anchor: centered_anchor(),
            texture: None,
            is_cover: false,
            layers: single_layer(),
            extended: Extended::default(),
            notes: Vec::new(),
        }
    }
}

/// Sorted insert that refuses overlapping ranges.
fn insert_sorted<V>(
    events: &mut Vec<Event<V>>,
    event: Event<V>,
    channel: &'static str,
) -> ChartResult<()> {
    if event.end < event.start {
        return Err(ChartError::InvalidEventRange {
            start: event.start.value(),
            end: event.end.value(),
        });
    }
    let clash = events.iter().any(|e| e.overlaps(event.start, event.end));
    if clash {
        return Err(ChartError::EventOverlap {
            channel,
            start: event.start.value(),
            end: event.end.value(),
        });
    }
    let index = events.partition_point(|e| (e.start, e.end) <= (event.start, event.end));
    events.insert(index, event);
    Ok(())
}

fn remove_by_id<V>(events: &mut Vec<Event<V>>, id: super::EventId) -> ChartResult<Event<V>> {
    match events.iter().position(|e| e.id == id) {
        Some(index) => Ok(events.remove(index)),
        None => Err(ChartError::EventNotFound(id)),
    }
}

fn replace_by_id<V>(
    events: &mut Vec<Event<V>>,
    id: super::EventId,
    event: Event<V>,
    channel: &'static str,
) -> ChartResult<Event<V>> {
    let Some(index) = events.iter().position(|e| e.id == id) else {
        return Err(ChartError::EventNotFound(id));
    };
    let old = events.remove(index);
    match insert_sorted(events, event, channel) {
        Ok(()) => Ok(old),
        Err(e) => {
            events.insert(index, old);
            Err(e)
        }
    }
}

enum Slot<'a> {
    Numeric(&'a mut Vec<Event<f64>>),
    Color(&'a mut Vec<Event<Color>>),
    Text(&'a mut Vec<Event<String>>),
}

impl JudgeLine {
    fn slot(&mut self, line: usize, channel: EventChannel) -> ChartResult<Slot<'_>> {
        let slot = match channel {
            EventChannel::Layer { layer, channel } => {
                let Some(events) = self.layers.get_mut(layer) else {
                    return Err(ChartError::LayerOutOfRange { line, layer });
                };
                Slot::Numeric(match channel {
                    LayerChannel::MoveX => &mut events.move_x,
                    LayerChannel::MoveY => &mut events.move_y,
                    LayerChannel::Rotate => &mut events.rotate,
                    LayerChannel::Alpha => &mut events.alpha,
                    LayerChannel::Speed => &mut events.speed,
                })
            }
            EventChannel::Extended(channel) => match channel {
                ExtendedChannel::ScaleX => Slot::Numeric(&mut self.extended.scale_x),
                ExtendedChannel::ScaleY => Slot::Numeric(&mut self.extended.scale_y),
                ExtendedChannel::Paint => Slot::Numeric(&mut self.extended.paint),
                ExtendedChannel::Color => Slot::Color(&mut self.extended.color),
                ExtendedChannel::Text => Slot::Text(&mut self.extended.text),
            },
        };
        Ok(slot)
    }

    pub(crate) fn insert_event(
        &mut self,
        line: usize,
        channel: EventChannel,
        event: AnyEvent,
    ) -> ChartResult<()> {
        let name = channel.name();
        match (self.slot(line, channel)?, event) {
            (Slot::Numeric(events), AnyEvent::Numeric(e)) => insert_sorted(events, e, name),
            (Slot::Color(events), AnyEvent::Color(e)) => insert_sorted(events, e, name),
            (Slot::Text(events), AnyEvent::Text(e)) => insert_sorted(events, e, name),
            _ => Err(ChartError::EventKindMismatch(name)),
        }
    }

    pub(crate) fn remove_event(
        &mut self,
        line: usize,
        channel: EventChannel,
        id: super::EventId,
    ) -> ChartResult<AnyEvent> {
        let event = match self.slot(line, channel)? {
            Slot::Numeric(events) => AnyEvent::Numeric(remove_by_id(events, id)?),
            Slot::Color(events) => AnyEvent::Color(remove_by_id(events, id)?),
            Slot::Text(events) => AnyEvent::Text(remove_by_id(events, id)?),
        };
        Ok(event)
    }

    pub(crate) fn replace_event(
        &mut self,
        line: usize,
        channel: EventChannel,
        id: super::EventId,
        event: AnyEvent,
    ) -> ChartResult<AnyEvent> {
        let name = channel.name();
        let old = match (self.slot(line, channel)?, event) {
            (Slot::Numeric(events), AnyEvent::Numeric(e)) => {
                AnyEvent::Numeric(replace_by_id(events, id, e, name)?)
            }
            (Slot::Color(events), AnyEvent::Color(e)) => {
                AnyEvent::Color(replace_by_id(events, id, e, name)?)
            }
            (Slot::Text(events), AnyEvent::Text(e)) => {
                AnyEvent::Text(replace_by_id(events, id, e, name)?)
            }
            _ => return Err(ChartError::EventKindMismatch(name)),
        };
        Ok(old)
    }

    pub fn find_event(&self, channel: EventChannel, id: super::EventId) -> Option<AnyEvent> {
        let find = |events: &Vec<Event<f64>>| events.iter().find(|e| e.id == id).cloned();
        match channel {
            EventChannel::Layer { layer, channel } => {
                let events = self.layers.get(layer)?;
                let list = match channel {
                    LayerChannel::MoveX => &events.move_x,
                    LayerChannel::MoveY => &events.move_y,
                    LayerChannel::Rotate => &events.rotate,
                    LayerChannel::Alpha => &events.alpha,
                    LayerChannel::Speed => &events.speed,
                };
                find(list).map(AnyEvent::Numeric)
            }
            EventChannel::Extended(ExtendedChannel::ScaleX) => {
                find(&self.extended.scale_x).map(AnyEvent::Numeric)
            }
            EventChannel::Extended(ExtendedChannel::ScaleY) => {
                find(&self.extended.scale_y).map(AnyEvent::Numeric)
            }
            EventChannel::Extended(ExtendedChannel::Paint) => {
                find(&self.extended.paint).map(AnyEvent::Numeric)
            }
            EventChannel::Extended(ExtendedChannel::Color) => self
                .extended
                .color
                .iter()
                .find(|e| e.id == id)
                .cloned()
                .map(AnyEvent::Color),
            EventChannel::Extended(ExtendedChannel::Text) => self
                .extended
                .text
                .iter()
                .find(|e| e.id == id)
                .cloned()
                .map(AnyEvent::Text),
        }
    }

    pub fn note_index(&self, id: super::NoteId) -> Option<usize> {
        self.notes.iter().position(|n| n.id == id)
    }

    /// Visits every event id slot, used when ids are (re)assigned after loading.
    pub(crate) fn for_each_event_id(&mut self, mut f: impl FnMut(&mut super::EventId)) {
        for layer in self.layers.iter_mut() {
            for list in [
                &mut layer.move_x,
                &mut layer.move_y,
                &mut layer.rotate,
                &mut layer.alpha,
                &mut layer.speed,
            ] {
                list.iter_mut().for_each(|e| f(&mut e.id));
            }
        }
        for list in [
            &mut self.extended.scale_x,
            &mut self.extended.scale_y,
            &mut self.extended.paint,
        ] {
            list.iter_mut().for_each(|e| f(&mut e.id));
        }
        self.extended.color.iter_mut().for_each(|e| f(&mut e.id));
        self.extended.text.iter_mut().for_each(|e| f(&mut e.id));
    }

    /// Sorts every sequence by start so evaluation can binary-search it.
    pub(crate) fn sort_events(&mut self) {
        fn sort<V>(list: &mut [Event<V>]) {
            list.sort_by(|a, b| (a.start, a.end).cmp(&(b.start, b.end)));
        }
        for layer in self.layers.iter_mut() {
            sort(&mut layer.move_x);
            sort(&mut layer.move_y);
            sort(&mut layer.rotate);
            sort(&mut layer.alpha);
            sort(&mut layer.speed);
        }
        sort(&mut self.extended.scale_x);
        sort(&mut self.extended.scale_y);
        sort(&mut self.extended.paint);
        sort(&mut self.extended.color);
        sort(&mut self.extended.text);
    }
}
