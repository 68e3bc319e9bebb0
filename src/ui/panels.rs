/// Viewer, marking controls and the annotation form
use iced::widget::image::Handle;
use iced::widget::{
    button, canvas, checkbox, column, container, image, pick_list, radio, row, text, text_input,
};
use iced::{Alignment, Color, ContentFit, Element, Length};

use super::strip::SequenceStrip;
use crate::state::data::ImageRef;
use crate::state::form::{AnnotationForm, ObservationType, Vocabulary};
use crate::state::marks::MarkPhase;
use crate::state::AnnotationSession;
use crate::sync::roster::ReviewerChoices;
use crate::Message;

const WARNING: Color = Color::from_rgb(0.95, 0.75, 0.3);

fn handle_for(image: &ImageRef) -> Handle {
    Handle::from_path(&image.path)
}

/// Current image, its name, the sequence strip and navigation
pub fn viewer(session: &AnnotationSession) -> Element<'_, Message> {
    let picture: Element<'_, Message> = match session.current_image() {
        Some(current) => image(handle_for(current))
            .content_fit(ContentFit::Contain)
            .width(Length::Fill)
            .height(Length::Fill)
            .into(),
        None => container(text("No images loaded. Pick files or a folder to begin.").size(16))
            .center(Length::Fill)
            .into(),
    };

    let name = session
        .current_image()
        .map(|image| image.name.as_str())
        .unwrap_or("");
    let position = session.images().position();
    let total = session.images().len();

    let navigation = row![
        button("◀ Previous")
            .on_press_maybe((position > 0).then_some(Message::Previous))
            .padding(8),
        text(session.counter_label()).size(16),
        button("Next ▶")
            .on_press_maybe((position + 1 < total).then_some(Message::Next))
            .padding(8),
    ]
    .spacing(16)
    .align_y(Alignment::Center);

    column![
        picture,
        text(name).size(14),
        canvas(SequenceStrip::from_session(session))
            .width(Length::Fill)
            .height(Length::Fixed(12.0)),
        navigation,
    ]
    .spacing(10)
    .align_x(Alignment::Center)
    .into()
}

/// What to do next, given the marks so far
fn phase_hint(phase: MarkPhase) -> &'static str {
    match phase {
        MarkPhase::NoMarks => "Mark the first image of a sequence, or flag a single image.",
        MarkPhase::StartOnly => "Now mark the last image of the sequence.",
        MarkPhase::EndOnly => "Now mark the first image of the sequence.",
        MarkPhase::StartAndEnd { ordered: false } => "Reorder the marks before saving.",
        MarkPhase::StartAndEnd { ordered: true } | MarkPhase::SingleImage => {
            "Fill in the form and save."
        }
    }
}

/// Start/end/single checkboxes and what is currently marked.
///
/// Checkbox states are projections of the session; toggling one sends a
/// command, and a rejected command simply leaves the projection unchanged.
pub fn marks(session: &AnnotationSession) -> Element<'_, Message> {
    let has_image = session.current_image().is_some();
    let toggle = |on_toggle: fn(bool) -> Message| has_image.then_some(on_toggle);

    let state = session.marks();
    let time = |value: &str| {
        if value.is_empty() {
            String::new()
        } else {
            format!(" ({})", value)
        }
    };

    let mut content = column![
        checkbox("Single image observation", session.is_single_checked())
            .on_toggle_maybe(toggle(Message::SingleImage)),
        checkbox("Mark as sequence start", session.is_start_checked())
            .on_toggle_maybe(toggle(Message::MarkStart)),
        checkbox("Mark as sequence end", session.is_end_checked())
            .on_toggle_maybe(toggle(Message::MarkEnd)),
        text(format!("Start: {}{}", session.start_label(), time(&state.start_time))).size(14),
        text(format!("End: {}{}", session.end_label(), time(&state.end_time))).size(14),
        text(phase_hint(state.phase())).size(13),
    ]
    .spacing(8);

    if session.end_before_start() {
        content = content.push(
            text("End image is before the start image; fix the marks before saving.")
                .size(13)
                .color(WARNING),
        );
    }
    content.into()
}

fn selected(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn labelled<'a>(label: &'a str, field: impl Into<Element<'a, Message>>) -> Element<'a, Message> {
    column![text(label).size(13), field.into()].spacing(4).into()
}

/// Observation metadata form
pub fn form<'a>(
    form: &'a AnnotationForm,
    date_text: &'a str,
    vocabulary: &'a Vocabulary,
    reviewers: &'a ReviewerChoices,
) -> Element<'a, Message> {
    let lists = form.observation_type.map(|kind| vocabulary.for_type(kind));
    let species = lists.map(|l| l.species.clone()).unwrap_or_default();
    let behaviors = lists.map(|l| l.behaviors.clone()).unwrap_or_default();

    let kinds = ObservationType::ALL.iter().fold(row![].spacing(16), |kinds, &kind| {
        kinds.push(radio(
            kind.as_str(),
            kind,
            form.observation_type,
            Message::TypeSelected,
        ))
    });

    // Without a roster the reviewer is typed in, so annotation is never blocked
    let reviewer: Element<'a, Message> = if reviewers.available && !reviewers.options.is_empty() {
        pick_list(
            reviewers.options.clone(),
            selected(&form.reviewer_name),
            Message::ReviewerSelected,
        )
        .placeholder("Select reviewer")
        .into()
    } else {
        let hint = reviewers
            .options
            .first()
            .map(String::as_str)
            .unwrap_or("Loading reviewers...");
        text_input(hint, &form.reviewer_name)
            .on_input(Message::ReviewerSelected)
            .into()
    };

    column![
        labelled(
            "Site",
            pick_list(vocabulary.sites.clone(), selected(&form.site), Message::SiteSelected)
                .placeholder("Select site"),
        ),
        labelled(
            "Camera",
            pick_list(vocabulary.cameras.clone(), selected(&form.camera), Message::CameraSelected)
                .placeholder("Select camera"),
        ),
        labelled(
            "Retrieval Date",
            text_input("YYYY-MM-DD", date_text).on_input(Message::RetrievalDateChanged),
        ),
        labelled("Type", kinds),
        labelled(
            "Species",
            pick_list(species, selected(&form.species), Message::SpeciesSelected)
                .placeholder("Select species"),
        ),
        labelled(
            "Behavior",
            pick_list(behaviors, selected(&form.behavior), Message::BehaviorSelected)
                .placeholder("Select behavior"),
        ),
        labelled("Reviewer Name", reviewer),
        labelled(
            "Notes",
            text_input("Optional", &form.notes).on_input(Message::NotesChanged),
        ),
    ]
    .spacing(10)
    .into()
}

/// Save, sync and clear buttons with their enabled states
pub fn actions(session: &AnnotationSession) -> Element<'_, Message> {
    let can_clear = !session.is_syncing()
        && (!session.images().is_empty() || !session.records().is_empty());
    let sync_label = if session.is_syncing() {
        "Syncing..."
    } else {
        "Sync"
    };

    row![
        button("Save annotation")
            .on_press_maybe(session.can_save().then_some(Message::Save))
            .padding(10),
        button(sync_label)
            .on_press_maybe(session.can_sync().then_some(Message::Sync))
            .padding(10),
        button("Clear all")
            .on_press_maybe(can_clear.then_some(Message::ClearAll))
            .style(button::danger)
            .padding(10),
    ]
    .spacing(12)
    .into()
}
