use focalcore::interaction::{
    Axes, FetchRequest, InteractionController, Outcome, PlotEvent, ReviewState, Transition,
};
use focalcore::math::{StatsHelper, StereoPoint};
use focalcore::mechanism::FocalMechanism;
use focalcore::prelude::{ReviewConfig, ReviewResult, Rgb, TracePalette};
use focalcore::projection::{DrawCall, RecordingSurface};
use focalcore::waveform::{FetchedWaveform, WaveformFetcher};
use http_store::{fetch_mechanism, HttpStore};
use iced::{
    mouse,
    widget::{
        button,
        canvas::{self, Canvas, Frame, Geometry, Path, Stroke},
        column, mouse_area, row, scrollable, text, Column, Container,
    },
    Alignment, Color, Element, Length, Pixels, Point, Rectangle, Renderer, Task, Theme,
};
use log::{debug, info};
use std::sync::Arc;

mod http_store;

const DEFAULT_ARCHIVE: &str = "http://127.0.0.1:9000";
const NET_MARGIN: f32 = 28.0;
const MARKER_RADIUS: f32 = 5.0;

fn main() -> iced::Result {
    env_logger::init();
    iced::application(Visualizer::boot, Visualizer::update, Visualizer::view)
        .title(application_title)
        .theme(application_theme)
        .run()
}

fn application_title(_: &Visualizer) -> String {
    "Focal Mechanism Pick Review".into()
}

fn application_theme(_: &Visualizer) -> Theme {
    Theme::Dark
}

struct Visualizer {
    base: String,
    config: ReviewConfig,
    controller: Option<InteractionController<HttpStore>>,
    /// Bumped per loaded mechanism so fetches from an earlier session never land.
    session_id: u64,
    drawing: Vec<DrawCall>,
    status: String,
    summary: Option<String>,
}

#[derive(Debug, Clone)]
enum Message {
    MechanismLoaded(Result<FocalMechanism, String>),
    Plot(PlotEvent),
    ExpandContext,
    FetchFinished(u64, FetchRequest, ReviewResult<FetchedWaveform>),
    Finish,
    Reload,
}

impl Visualizer {
    fn boot() -> (Self, Task<Message>) {
        let base = std::env::var("FOCAL_ARCHIVE_URL").unwrap_or_else(|_| DEFAULT_ARCHIVE.into());
        (
            Visualizer {
                base: base.clone(),
                config: ReviewConfig::default(),
                controller: None,
                session_id: 0,
                drawing: Vec::new(),
                status: format!("Loading mechanism from {base}..."),
                summary: None,
            },
            Task::perform(fetch_mechanism(base), Message::MechanismLoaded),
        )
    }

    fn update(state: &mut Self, message: Message) -> Task<Message> {
        match message {
            Message::MechanismLoaded(Ok(mechanism)) => {
                state.open(mechanism);
                Task::none()
            }
            Message::MechanismLoaded(Err(err)) => {
                state.status = format!("Archive error: {err}");
                Task::none()
            }
            Message::Reload => {
                state.status = format!("Reloading from {}...", state.base);
                Task::perform(fetch_mechanism(state.base.clone()), Message::MechanismLoaded)
            }
            Message::Plot(PlotEvent::MarkerPick { tag, hits }) => {
                let Some(controller) = state.controller.as_mut() else {
                    return Task::none();
                };
                match controller.begin_pick(tag, &hits) {
                    Some(request) => {
                        state.status =
                            format!("Fetching {} -- {}...", request.station, request.arrival_id);
                        spawn_fetch(state.session_id, controller, request)
                    }
                    None => Task::none(),
                }
            }
            Message::Plot(event) => {
                if let Some(controller) = state.controller.as_mut() {
                    match controller.handle(event) {
                        Outcome::Updated(Transition::Toggled { label, .. }) => {
                            state.status = format!("Relabelled as {label}");
                        }
                        Outcome::Failed(err) => state.status = err.to_string(),
                        _ => {}
                    }
                }
                Task::none()
            }
            Message::ExpandContext => {
                let Some(controller) = state.controller.as_mut() else {
                    return Task::none();
                };
                match controller.begin_context() {
                    Ok(request) => spawn_fetch(state.session_id, controller, request),
                    Err(err) => {
                        state.status = err.to_string();
                        Task::none()
                    }
                }
            }
            Message::FetchFinished(session_id, request, result) => {
                if session_id != state.session_id {
                    debug!("dropping fetch from closed session {}", session_id);
                    return Task::none();
                }
                if let Some(controller) = state.controller.as_mut() {
                    state.status = match controller.complete_fetch(&request, result) {
                        Ok(Transition::Superseded { .. }) => return Task::none(),
                        Ok(Transition::ContextShown { .. }) => {
                            format!("{}: {:.1}s context", request.station, request.seconds)
                        }
                        Ok(Transition::Selected { label, .. }) => {
                            let rms = controller
                                .session()
                                .panel()
                                .trace
                                .as_ref()
                                .map(|trace| StatsHelper::rms(&trace.fetched.segment.samples))
                                .unwrap_or(0.0);
                            format!(
                                "Reviewing {} -- {} as {} (rms {:.3})",
                                request.station, request.arrival_id, label, rms
                            )
                        }
                        Ok(_) => return Task::none(),
                        Err(err) if !err.is_user_visible() => return Task::none(),
                        Err(err) => format!("{}: {}", request.station, err),
                    };
                }
                Task::none()
            }
            Message::Finish => {
                if let Some(controller) = state.controller.take() {
                    let summary = controller.close();
                    info!(
                        "review of {} closed: {} reviewed, {} corrected",
                        summary.origin_id,
                        summary.reviewed.len(),
                        summary.corrections.len()
                    );
                    state.status = format!(
                        "Review closed: {} reviewed / {} corrected",
                        summary.reviewed.len(),
                        summary.corrections.len()
                    );
                    state.summary = serde_json::to_string_pretty(&summary).ok();
                    state.session_id += 1;
                }
                Task::none()
            }
        }
    }

    fn open(&mut self, mechanism: FocalMechanism) {
        let store = Arc::new(HttpStore::new(
            self.base.clone(),
            self.config.fetch_timeout(),
        ));
        let fetcher = WaveformFetcher::new(store, &self.config);
        match InteractionController::open(mechanism, fetcher, self.config.clone()) {
            Ok(controller) => {
                let mut surface = RecordingSurface::new();
                controller.render(&mut surface);
                self.drawing = surface.calls;
                self.status = format!(
                    "Loaded {} picks for {}",
                    controller.session().mechanism().picks.len(),
                    controller.session().mechanism().origin_id
                );
                self.session_id += 1;
                self.controller = Some(controller);
                self.summary = None;
            }
            Err(err) => self.status = format!("Cannot plot mechanism: {err}"),
        }
    }

    fn view(state: &Self) -> Element<'_, Message> {
        let session = state.controller.as_ref().map(|controller| controller.session());
        let selected = session.and_then(|session| {
            let layout = session.layout();
            let (tag, local) = layout.index.locate(session.selection()?.pick)?;
            layout.group(tag).markers.get(local).map(|marker| marker.point)
        });
        let reviewing = session.map(|session| session.state()) == Some(ReviewState::Reviewing);

        let stereonet = Canvas::new(Stereonet {
            calls: state.drawing.clone(),
            palette: state.config.palette,
            selected,
        })
        .width(Length::Fixed(440.0))
        .height(Length::Fixed(440.0));

        let controls = row![
            button("Context")
                .on_press_maybe(reviewing.then_some(Message::ExpandContext))
                .padding(8),
            button("Finish review")
                .on_press_maybe(state.controller.is_some().then_some(Message::Finish))
                .padding(8),
            button("Reload").on_press(Message::Reload).padding(8),
        ]
        .spacing(10);

        let net_column = column![text("Stereonet").size(24), stereonet, controls]
            .spacing(10)
            .padding(16)
            .width(Length::Fixed(480.0));

        let panel = session.map(|session| session.panel());
        let title = panel
            .map(|panel| panel.title.clone())
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| "Click a marker to review its pick".into());
        let axis_label = panel.map(|panel| panel.axis_label.clone()).unwrap_or_default();
        let trace = match panel.and_then(|panel| panel.trace.as_ref().map(|t| (panel, t))) {
            Some((panel, view)) => {
                let segment = &view.fetched.segment;
                let span = (segment.end() - segment.start).max(f64::EPSILON);
                Trace {
                    samples: segment.samples.clone(),
                    color: view.color,
                    highlighted: panel.highlighted,
                    onset: Some(((view.fetched.arrival.onset - segment.start) / span) as f32),
                }
            }
            None => Trace {
                samples: Vec::new(),
                color: [0.6, 0.6, 0.6],
                highlighted: panel.map(|panel| panel.highlighted).unwrap_or(false),
                onset: None,
            },
        };
        let waveform = mouse_area(
            Canvas::new(trace)
                .width(Length::Fill)
                .height(Length::Fixed(260.0)),
        )
        .on_enter(Message::Plot(PlotEvent::PointerEnter {
            axes: Axes::Waveform,
        }))
        .on_exit(Message::Plot(PlotEvent::PointerLeave {
            axes: Axes::Waveform,
        }))
        .on_press(Message::Plot(PlotEvent::ButtonPress {
            axes: Some(Axes::Waveform),
        }));

        let history_list = match state.controller.as_ref() {
            Some(controller) if !controller.log().is_empty() => controller
                .log()
                .entries()
                .rev()
                .fold(Column::new().spacing(4), |col, entry| {
                    col.push(text(entry.clone()).size(12))
                }),
            _ => Column::new().push(text("No activity yet").size(12)),
        };

        let mut review_column = column![
            text("Waveform").size(24),
            text(title).size(18),
            row![text(axis_label).size(28), waveform]
                .spacing(12)
                .align_y(Alignment::Center),
            text("Click the trace to flip its first-motion label.").size(12),
            text(&state.status).size(14),
            text("Activity log").size(16),
            Container::new(scrollable(history_list).height(Length::Fixed(140.0))).padding(6),
        ]
        .spacing(10)
        .padding(16)
        .width(Length::Fill);

        if let Some(summary) = &state.summary {
            review_column = review_column.push(text("Summary").size(16)).push(
                Container::new(scrollable(text(summary.clone()).size(12)).height(Length::Fixed(160.0)))
                    .padding(6),
            );
        }

        let layout = row![net_column, review_column]
            .spacing(20)
            .align_y(Alignment::Start)
            .padding(20);

        Container::new(layout)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_y(Length::Fill)
            .into()
    }
}

/// Starts an off-thread fetch; the result is handed back tagged with its request.
fn spawn_fetch(
    session_id: u64,
    controller: &InteractionController<HttpStore>,
    request: FetchRequest,
) -> Task<Message> {
    let fetcher = controller.fetcher().clone();
    Task::perform(
        async move {
            let result = fetcher
                .fetch_async(
                    request.locator.clone(),
                    request.arrival_id,
                    request.seconds,
                    request.generation,
                )
                .await;
            (request, result)
        },
        move |(request, result)| Message::FetchFinished(session_id, request, result),
    )
}

fn rgb(color: Rgb) -> Color {
    Color::from_rgb(color[0], color[1], color[2])
}

/// Canvas placement of the unit stereonet: center and radius in pixels.
fn net_geometry(bounds: Rectangle) -> (Point, f32) {
    let center = Point::new(bounds.width / 2.0, bounds.height / 2.0);
    let radius = (bounds.width.min(bounds.height) / 2.0 - NET_MARGIN).max(1.0);
    (center, radius)
}

fn to_screen(center: Point, radius: f32, point: StereoPoint) -> Point {
    Point::new(
        center.x + point.x as f32 * radius,
        center.y - point.y as f32 * radius,
    )
}

fn to_net(center: Point, radius: f32, position: Point) -> StereoPoint {
    StereoPoint::new(
        f64::from((position.x - center.x) / radius),
        f64::from((center.y - position.y) / radius),
    )
}

/// Replays the recorded projection and turns clicks into marker picks.
struct Stereonet {
    calls: Vec<DrawCall>,
    palette: TracePalette,
    selected: Option<StereoPoint>,
}

impl Stereonet {
    /// The group holding the nearest marker wins; hits stay nearest first.
    fn marker_pick(&self, at: StereoPoint, reach: f64) -> Option<PlotEvent> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DrawCall::Markers(group) => Some(group),
                _ => None,
            })
            .filter_map(|group| {
                let hits = group.hits_within(at, reach);
                let nearest = group.markers.get(*hits.first()?)?.point.distance(&at);
                Some((nearest, group.tag, hits))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, tag, hits)| PlotEvent::MarkerPick { tag, hits })
    }
}

impl canvas::Program<Message> for Stereonet {
    type State = ();

    fn update(
        &self,
        _state: &mut Self::State,
        event: &canvas::Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> Option<canvas::Action<Message>> {
        let canvas::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) = event else {
            return None;
        };
        let position = cursor.position_in(bounds)?;
        let (center, radius) = net_geometry(bounds);
        let at = to_net(center, radius, position);
        let reach = f64::from(MARKER_RADIUS * 1.5 / radius);
        self.marker_pick(at, reach)
            .map(|event| canvas::Action::publish(Message::Plot(event)).and_capture())
    }

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        frame.fill_rectangle(
            Point::ORIGIN,
            bounds.size(),
            Color::from_rgb(0.02, 0.02, 0.04),
        );
        let (center, radius) = net_geometry(bounds);
        let primitive = Path::circle(center, radius);
        frame.fill(&primitive, Color::from_rgb(0.08, 0.08, 0.1));
        frame.stroke(
            &primitive,
            Stroke::default()
                .with_width(1.5)
                .with_color(Color::from_rgb(0.6, 0.6, 0.65)),
        );

        for call in &self.calls {
            match call {
                DrawCall::Title(title) => frame.fill_text(canvas::Text {
                    content: title.clone(),
                    position: Point::new(6.0, 4.0),
                    color: Color::WHITE,
                    size: Pixels(14.0),
                    ..canvas::Text::default()
                }),
                DrawCall::AzimuthTicks(labels) => {
                    let step = 360.0 / labels.len().max(1) as f64;
                    for (i, label) in labels.iter().enumerate() {
                        let azimuth = (i as f64 * step).to_radians();
                        let tick = StereoPoint::new(azimuth.sin() * 1.08, azimuth.cos() * 1.08);
                        let position = to_screen(center, radius, tick);
                        frame.fill_text(canvas::Text {
                            content: label.clone(),
                            position: Point::new(position.x - 8.0, position.y - 6.0),
                            color: Color::from_rgb(0.7, 0.7, 0.75),
                            size: Pixels(10.0),
                            ..canvas::Text::default()
                        });
                    }
                }
                DrawCall::Plane { path, .. } => {
                    let curve = Path::new(|builder| {
                        for (i, point) in path.iter().enumerate() {
                            let screen = to_screen(center, radius, *point);
                            if i == 0 {
                                builder.move_to(screen);
                            } else {
                                builder.line_to(screen);
                            }
                        }
                    });
                    frame.stroke(
                        &curve,
                        Stroke::default()
                            .with_width(2.0)
                            .with_color(Color::from_rgb(0.85, 0.85, 0.85)),
                    );
                }
                DrawCall::Slip(point) => {
                    let slip = Path::rectangle(
                        {
                            let p = to_screen(center, radius, *point);
                            Point::new(p.x - 3.0, p.y - 3.0)
                        },
                        iced::Size::new(6.0, 6.0),
                    );
                    frame.fill(&slip, Color::from_rgb(0.95, 0.75, 0.2));
                }
                DrawCall::Markers(group) => {
                    let color = rgb(self.palette.color(group.tag.polarity()));
                    for marker in &group.markers {
                        let dot = Path::circle(
                            to_screen(center, radius, marker.point),
                            MARKER_RADIUS,
                        );
                        frame.fill(&dot, color);
                    }
                }
                DrawCall::Label { point, text } => frame.fill_text(canvas::Text {
                    content: text.clone(),
                    position: to_screen(center, radius, *point),
                    color: Color::from_rgb(0.8, 0.8, 0.8),
                    size: Pixels(10.0),
                    ..canvas::Text::default()
                }),
            }
        }

        if let Some(point) = self.selected {
            let ring = Path::circle(to_screen(center, radius, point), MARKER_RADIUS + 4.0);
            frame.stroke(
                &ring,
                Stroke::default()
                    .with_width(2.0)
                    .with_color(Color::from_rgb(1.0, 1.0, 0.3)),
            );
        }

        vec![frame.into_geometry()]
    }
}

/// The reviewed trace; the whole canvas is the toggle target.
struct Trace {
    samples: Vec<f32>,
    color: Rgb,
    highlighted: bool,
    /// Onset position as a fraction of the panel width.
    onset: Option<f32>,
}

impl canvas::Program<Message> for Trace {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        let background = if self.highlighted {
            Color::from_rgb(0.14, 0.14, 0.18)
        } else {
            Color::from_rgb(0.05, 0.05, 0.05)
        };
        frame.fill_rectangle(Point::ORIGIN, bounds.size(), background);

        if let Some(onset) = self.onset.filter(|f| (0.0..=1.0).contains(f)) {
            let x = onset * bounds.width;
            let line = Path::line(Point::new(x, 0.0), Point::new(x, bounds.height));
            frame.stroke(
                &line,
                Stroke::default().with_color(Color::from_rgb(0.4, 0.4, 0.45)),
            );
        }

        if self.samples.len() > 1 {
            let normalized = StatsHelper::normalize(&self.samples);
            let mid = bounds.height / 2.0;
            let step = bounds.width / (normalized.len() as f32 - 1.0);
            let path = Path::new(|builder| {
                for (i, value) in normalized.iter().enumerate() {
                    let point = Point::new(i as f32 * step, mid - value * mid * 0.9);
                    if i == 0 {
                        builder.move_to(point);
                    } else {
                        builder.line_to(point);
                    }
                }
            });
            frame.stroke(
                &path,
                Stroke::default()
                    .with_width(if self.highlighted { 3.0 } else { 2.0 })
                    .with_color(rgb(self.color)),
            );
        }

        vec![frame.into_geometry()]
    }
}
