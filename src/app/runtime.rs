use std::time::Duration;

use anyhow::{Result, anyhow};
use crossterm::event::{self, Event, KeyEventKind};
use jsonschema::Validator;
use ratatui::{
    Frame,
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use serde_json::Value;

use crate::{
    domain::{FieldKind, FieldSchema, ScalarKind},
    form::{
        FieldValue, FormController, ParsedPath, RenderSettle, RepeatableState, ValidationReport,
        parse_path, route_to_first_error,
    },
    presentation::{self, ActiveCursor, FrameContext},
};

use super::{
    edit::{apply_backspace, apply_char, apply_toggle},
    keymap::{EditorCommand, HELP_TEXT, map_key},
    options::UiOptions,
    status::StatusLine,
    terminal::TerminalGuard,
};

/// Blocks for a fixed delay at every settle point; the render pass has no
/// completion signal to wait on, so the delay is conservative.
struct DelaySettle(Duration);

impl RenderSettle for DelaySettle {
    fn settle(&mut self) {
        std::thread::sleep(self.0);
    }
}

pub(crate) struct App {
    controller: FormController,
    validator: Validator,
    options: UiOptions,
    status: StatusLine,
    title: String,
    global_errors: Vec<String>,
    field_index: usize,
    /// (child field, parent record index) hops from the focused top-level
    /// repeatable down to the active instance.
    drill: Vec<(String, usize)>,
    child_cursor: usize,
    scroll: u16,
    dirty: bool,
    exit_armed: bool,
    should_quit: bool,
    result: Option<Value>,
}

impl App {
    pub(crate) fn new(
        controller: FormController,
        validator: Validator,
        title: String,
        options: UiOptions,
    ) -> Self {
        Self {
            controller,
            validator,
            options,
            status: StatusLine::new(),
            title,
            global_errors: Vec::new(),
            field_index: 0,
            drill: Vec::new(),
            child_cursor: 0,
            scroll: 0,
            dirty: false,
            exit_armed: false,
            should_quit: false,
            result: None,
        }
    }

    pub(crate) fn run(mut self, terminal: &mut TerminalGuard) -> Result<Value> {
        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.should_quit {
                break;
            }
            if event::poll(self.options.tick_rate)?
                && let Event::Key(key) = event::read()?
                && key.kind != KeyEventKind::Release
                && let Some(command) = map_key(key)
            {
                self.handle_command(command);
            }
        }
        self.result.ok_or_else(|| anyhow!("exited without saving"))
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let area = frame.area();
        let (body, focus_line) = self.body_lines(area.width.saturating_sub(2));
        let viewport = presentation::body_viewport(
            area,
            self.global_errors.len(),
            self.options.show_help,
        );
        if let Some(focus) = focus_line {
            let focus = focus as u16;
            if focus < self.scroll {
                self.scroll = focus;
            } else if viewport > 0 && focus >= self.scroll + viewport {
                self.scroll = focus + 1 - viewport;
            }
        }
        presentation::render_frame(
            frame,
            FrameContext {
                title: &self.title,
                body,
                scroll: self.scroll,
                status: self.status.message(),
                help: self.options.show_help.then_some(HELP_TEXT),
                global_errors: &self.global_errors,
            },
        );
    }

    fn body_lines(&self, width: u16) -> (Vec<Line<'static>>, Option<usize>) {
        let mut lines = Vec::new();
        let mut focus_line = None;
        for (index, field) in self.controller.fields().iter().enumerate() {
            let focused = index == self.field_index;
            match &field.kind {
                FieldKind::Scalar(_) => {
                    lines.push(scalar_field_line(
                        field,
                        self.controller.scalar_value(&field.name),
                        focused,
                    ));
                    if focused {
                        focus_line = Some(lines.len() - 1);
                    }
                }
                FieldKind::Repeatable(_) => {
                    let Some(state) = self.controller.repeatable(&field.name) else {
                        continue;
                    };
                    lines.push(repeatable_header_line(field, state.len(), focused));
                    if focused {
                        focus_line = Some(lines.len() - 1);
                    }
                    let cursor = focused.then(|| ActiveCursor {
                        hops: &self.drill,
                        child_cursor: self.child_cursor,
                    });
                    let render = presentation::instance_lines(state, 1, width, cursor.as_ref());
                    if let Some(offset) = render.focus_line {
                        focus_line = Some(lines.len() + offset);
                    }
                    lines.extend(render.lines);
                }
            }
            if let Some(messages) = self.controller.field_error(&field.name) {
                for message in messages {
                    lines.push(Line::from(Span::styled(
                        format!("    ⚠ {message}"),
                        Style::default().fg(Color::Red),
                    )));
                }
            }
            lines.push(Line::from(""));
        }
        (lines, focus_line)
    }

    fn handle_command(&mut self, command: EditorCommand) {
        match command {
            EditorCommand::Save => {
                self.exit_armed = false;
                self.on_save();
            }
            EditorCommand::Quit => self.on_exit(),
            EditorCommand::FieldNext => self.step_field(1),
            EditorCommand::FieldPrev => self.step_field(-1),
            EditorCommand::CursorNext => self.step_cursor(1),
            EditorCommand::CursorPrev => self.step_cursor(-1),
            EditorCommand::EntryNext => {
                if let Some(instance) = self.active_instance_mut() {
                    instance.select(1);
                }
            }
            EditorCommand::EntryPrev => {
                if let Some(instance) = self.active_instance_mut() {
                    instance.select(-1);
                }
            }
            EditorCommand::AddEntry => self.on_add_entry(),
            EditorCommand::RemoveEntry => self.on_remove_entry(),
            EditorCommand::MoveEntryUp => self.on_move_entry(-1),
            EditorCommand::MoveEntryDown => self.on_move_entry(1),
            EditorCommand::ToggleCollapse => {
                if let Some(instance) = self.active_instance_mut()
                    && let Some(index) = instance.selected_index()
                {
                    instance.toggle_collapse(index);
                }
            }
            EditorCommand::Activate => self.on_activate(),
            EditorCommand::DrillOut => self.on_drill_out(),
            EditorCommand::Input(ch) => self.on_input(ch),
            EditorCommand::Backspace => self.on_backspace(),
        }
    }

    fn focused_field(&self) -> Option<&FieldSchema> {
        self.controller.fields().get(self.field_index)
    }

    fn active_instance(&self) -> Option<&RepeatableState> {
        let field = self.focused_field()?;
        if !field.is_repeatable() {
            return None;
        }
        let mut instance = self.controller.repeatable(&field.name)?;
        for (child, parent_index) in &self.drill {
            instance = instance.nested(*parent_index, child)?;
        }
        Some(instance)
    }

    fn active_instance_mut(&mut self) -> Option<&mut RepeatableState> {
        let field = self.focused_field()?.clone();
        if !field.is_repeatable() {
            return None;
        }
        let drill = self.drill.clone();
        let mut instance = self.controller.repeatable_mut(&field.name)?;
        for (child, parent_index) in &drill {
            instance = instance.nested_mut(*parent_index, child)?;
        }
        Some(instance)
    }

    fn active_child(&self) -> Option<FieldSchema> {
        let instance = self.active_instance()?;
        instance
            .schema()
            .child_fields
            .get(self.child_cursor)
            .cloned()
    }

    fn step_field(&mut self, delta: i32) {
        let len = self.controller.fields().len() as i32;
        if len == 0 {
            return;
        }
        let next = (self.field_index as i32 + delta).rem_euclid(len);
        self.field_index = next as usize;
        self.drill.clear();
        self.child_cursor = 0;
        self.exit_armed = false;
    }

    fn step_cursor(&mut self, delta: i32) {
        match self.active_instance() {
            Some(instance) => {
                let len = instance.schema().child_fields.len() as i32;
                if len == 0 {
                    return;
                }
                let next = (self.child_cursor as i32 + delta).clamp(0, len - 1);
                self.child_cursor = next as usize;
            }
            None => self.step_field(delta),
        }
    }

    fn on_add_entry(&mut self) {
        let Some(instance) = self.active_instance_mut() else {
            self.status.set_raw("Focus a repeatable field before Ctrl+N add");
            return;
        };
        let label = instance.schema().item_label().to_string();
        if instance.add_item() {
            let count = instance.len();
            self.after_mutation();
            self.status.set_raw(format!("Added {label} {count}"));
        } else {
            self.status.set_raw("List is at its maximum");
        }
    }

    fn on_remove_entry(&mut self) {
        let Some(instance) = self.active_instance_mut() else {
            self.status.set_raw("Focus a repeatable field before Ctrl+D remove");
            return;
        };
        let Some(index) = instance.selected_index() else {
            self.status.set_raw("No entry to remove");
            return;
        };
        if instance.remove_item(index) {
            self.after_mutation();
            self.status.set_raw("Removed entry");
        } else {
            self.status.set_raw("Cannot remove below the minimum");
        }
    }

    fn on_move_entry(&mut self, delta: i32) {
        let Some(instance) = self.active_instance_mut() else {
            return;
        };
        let Some(from) = instance.selected_index() else {
            return;
        };
        let to = from as i32 + delta;
        if to < 0 || to >= instance.len() as i32 {
            self.status.set_raw("Cannot move entry further");
            return;
        }
        if instance.move_item(from, to as usize) {
            self.after_mutation();
            self.status.set_raw(format!("Moved entry to position {}", to + 1));
        }
    }

    fn on_activate(&mut self) {
        if let Some(child) = self.active_child() {
            match &child.kind {
                FieldKind::Repeatable(_) => {
                    let Some(instance) = self.active_instance() else {
                        return;
                    };
                    let Some(index) = instance.selected_index() else {
                        self.status.set_raw("Add an entry first (Ctrl+N)");
                        return;
                    };
                    if instance.nested(index, &child.name).is_some() {
                        self.drill.push((child.name.clone(), index));
                        self.child_cursor = 0;
                        self.status.set_raw(format!("Editing {}", child.display_label()));
                    } else {
                        self.status.set_raw("Nesting limit reached");
                    }
                }
                FieldKind::Scalar(kind) => self.toggle_active_child(&child.name, kind),
            }
            return;
        }

        // Top-level scalar field: Enter toggles booleans and cycles selects.
        let Some(field) = self.focused_field().cloned() else {
            return;
        };
        if let FieldKind::Scalar(kind) = &field.kind {
            let current = self
                .controller
                .scalar_value(&field.name)
                .map(FieldValue::to_value)
                .unwrap_or(Value::Null);
            if let Some(next) = apply_toggle(kind, &current) {
                self.controller.set_scalar(&field.name, &next);
                self.after_mutation();
            }
        }
    }

    fn toggle_active_child(&mut self, name: &str, kind: &ScalarKind) {
        let Some(instance) = self.active_instance() else {
            return;
        };
        let Some(index) = instance.selected_index() else {
            return;
        };
        let current = instance.records()[index]
            .get(name)
            .map(FieldValue::to_value)
            .unwrap_or(Value::Null);
        if let Some(next) = apply_toggle(kind, &current)
            && let Some(instance) = self.active_instance_mut()
            && instance.update_field(index, name, &next)
        {
            self.after_mutation();
        }
    }

    fn on_drill_out(&mut self) {
        if self.exit_armed {
            self.exit_armed = false;
            self.status.ready();
            return;
        }
        if self.drill.pop().is_some() {
            self.child_cursor = 0;
        }
    }

    fn on_input(&mut self, ch: char) {
        self.edit_scalar(|kind, current| apply_char(kind, current, ch));
    }

    fn on_backspace(&mut self) {
        self.edit_scalar(apply_backspace);
    }

    fn edit_scalar(&mut self, apply: impl Fn(&ScalarKind, &Value) -> Option<Value>) {
        if let Some(child) = self.active_child() {
            let FieldKind::Scalar(kind) = &child.kind else {
                return;
            };
            let Some(instance) = self.active_instance() else {
                return;
            };
            let Some(index) = instance.selected_index() else {
                return;
            };
            let current = instance.records()[index]
                .get(&child.name)
                .map(FieldValue::to_value)
                .unwrap_or(Value::Null);
            if let Some(next) = apply(kind, &current)
                && let Some(instance) = self.active_instance_mut()
                && instance.update_field(index, &child.name, &next)
            {
                self.after_mutation();
            }
            return;
        }

        let Some(field) = self.focused_field().cloned() else {
            return;
        };
        let FieldKind::Scalar(kind) = &field.kind else {
            return;
        };
        let current = self
            .controller
            .scalar_value(&field.name)
            .map(FieldValue::to_value)
            .unwrap_or(Value::Null);
        if let Some(next) = apply(kind, &current) {
            self.controller.set_scalar(&field.name, &next);
            self.after_mutation();
        }
    }

    fn after_mutation(&mut self) {
        self.dirty = true;
        self.exit_armed = false;
        self.status.value_updated();
        if self.options.auto_validate {
            self.run_validation(false);
        }
    }

    fn run_validation(&mut self, route: bool) -> ValidationReport {
        let report = self.controller.validate(&self.validator);
        self.global_errors = report.global.clone();
        if report.is_valid() {
            self.controller.clear_errors();
        } else {
            self.controller.update_errors(report.errors.clone());
            if route {
                let mut settle = DelaySettle(self.options.settle_delay);
                if let Some(path) =
                    route_to_first_error(&mut self.controller, &report.errors, &mut settle)
                {
                    self.focus_path(&path);
                }
            }
        }
        report
    }

    fn on_save(&mut self) {
        let report = self.run_validation(true);
        if report.is_valid() {
            self.result = Some(self.controller.build_value());
            self.dirty = false;
            self.status.saved();
        } else {
            self.status.issues_remaining(report.issue_count());
        }
    }

    fn on_exit(&mut self) {
        if self.options.confirm_exit && self.dirty && !self.exit_armed {
            self.exit_armed = true;
            self.status.pending_exit();
            return;
        }
        self.should_quit = true;
    }

    /// Move the editing cursor onto the field a routed error path names.
    fn focus_path(&mut self, path: &str) {
        match parse_path(path) {
            ParsedPath::Scalar(name) => {
                if let Some(index) = self
                    .controller
                    .fields()
                    .iter()
                    .position(|field| field.name == name)
                {
                    self.field_index = index;
                    self.drill.clear();
                    self.child_cursor = 0;
                }
            }
            ParsedPath::Repeatable { field, index, rest } => {
                let Some(position) = self
                    .controller
                    .fields()
                    .iter()
                    .position(|candidate| candidate.name == field)
                else {
                    return;
                };
                self.field_index = position;
                self.drill.clear();
                self.child_cursor = 0;

                let Some(mut instance) = self.controller.repeatable(field) else {
                    return;
                };
                let mut record_index = index;
                let mut rest = rest;
                loop {
                    match parse_path(rest) {
                        ParsedPath::Scalar(leaf) => {
                            if let Some(cursor) = instance
                                .schema()
                                .child_fields
                                .iter()
                                .position(|child| child.name == leaf)
                            {
                                self.child_cursor = cursor;
                            }
                            break;
                        }
                        ParsedPath::Repeatable {
                            field: child,
                            index: child_index,
                            rest: child_rest,
                        } => {
                            let Some(nested) = instance.nested(record_index, child) else {
                                break;
                            };
                            self.drill.push((child.to_string(), record_index));
                            instance = nested;
                            record_index = child_index;
                            rest = child_rest;
                        }
                    }
                }
            }
        }
    }
}

fn scalar_field_line(
    field: &FieldSchema,
    value: Option<&FieldValue>,
    focused: bool,
) -> Line<'static> {
    let mut label = field.display_label();
    if field.required {
        label.push_str(" *");
    }
    let label_style = if focused {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    };
    let rendered = match value {
        Some(FieldValue::Scalar(Value::String(text))) if text.is_empty() => "~".to_string(),
        Some(FieldValue::Scalar(Value::String(text))) => text.clone(),
        Some(other) => other.to_value().to_string(),
        None => "~".to_string(),
    };
    Line::from(vec![
        Span::styled(label, label_style),
        Span::styled(": ", Style::default().fg(Color::DarkGray)),
        Span::styled(rendered, Style::default().fg(Color::White)),
    ])
}

fn repeatable_header_line(field: &FieldSchema, count: usize, focused: bool) -> Line<'static> {
    let mut label = field.display_label();
    if field.required {
        label.push_str(" *");
    }
    let style = if focused {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    };
    Line::from(vec![
        Span::styled(label, style),
        Span::styled(format!("  [{count}]"), Style::default().fg(Color::DarkGray)),
    ])
}
