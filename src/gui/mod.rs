use crate::models::events::Event;
use crate::models::votes::VotingItem;
use crate::tally;
use crate::APP_STATE;

pub mod state;

pub fn ui_main(ctx: &egui::Context) {
    // Live events arrive outside the frame loop; keep repainting so the
    // board moves even when the window sits untouched.
    ctx.request_repaint_after(std::time::Duration::from_millis(250));

    let mut pending_events = Vec::new();

    {
        let state = APP_STATE.lock().unwrap();
        if let Some(receiver) = &state.ws_event_receiver {
            while let Ok(event) = receiver.try_recv() {
                pending_events.push(event);
            }
        }
    }

    // Apply pending events one at a time: parse, reduce, re-sort, publish.
    {
        let mut state = APP_STATE.lock().unwrap();
        for event in pending_events {
            match event {
                Event::ConnectionEstablished => {
                    state.connected = true;
                    state.status_message = "Live feed connected".to_owned();
                }
                Event::ConnectionLost => {
                    state.connected = false;
                    state.status_message = "Live feed lost, reconnecting...".to_owned();
                }
                Event::Tally(tally_event) => {
                    let items = std::mem::take(&mut state.participants);
                    state.participants = tally::apply(items, &tally_event);
                    state
                        .logs
                        .push(format!("Vote received for item {}", tally_event.voting_item_id));
                }
            }
        }
    }

    let mut state = APP_STATE.lock().unwrap();

    egui::TopBottomPanel::top("header").show(ctx, |ui| {
        egui::Frame::default()
            .outer_margin(egui::vec2(0.0, 4.0))
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.with_layout(egui::Layout::left_to_right(egui::Align::Center), |ui| {
                        match &state.description {
                            Some(description) => ui.heading(description),
                            None => ui.heading(&state.title),
                        };
                    });

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if state.ws_handle.is_some() && ui.button("Disconnect").clicked() {
                            state.disconnect();
                        }
                        #[cfg(debug_assertions)]
                        if state.loaded && ui.button("Seed votes").clicked() {
                            state.seed_votes();
                        }
                    });
                });
            });
    });

    egui::CentralPanel::default().show(ctx, |ui| {
        if !state.loaded {
            ui.vertical_centered(|ui| {
                ui.add_space(12.0);
                ui.heading("Load voting");
                ui.add_space(12.0);
                egui::Grid::new("load_grid").num_columns(2).show(ui, |ui| {
                    ui.label("Server:");
                    ui.text_edit_singleline(&mut state.server_address);
                    ui.end_row();

                    ui.label("Vote id (optional):");
                    ui.text_edit_singleline(&mut state.vote_id);
                    ui.end_row();
                });

                ui.add_space(12.0);
                if ui.button("Load").clicked() {
                    state.load_voting();
                }
            });
        } else if state.participants.is_empty() {
            ui.vertical_centered(|ui| {
                ui.add_space(24.0);
                ui.heading("No voting to show on the site");
            });
        } else {
            let sms_number = state.sms_number.clone().unwrap_or_default();
            let top_count = tally::top_count(&state.participants);
            let winners_count = tally::winners_count(&state.participants);
            let top_id = state.participants[0].id;
            let status_known = state.status.is_some();

            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    if winners_count > 1 {
                        ui.heading("Winners");
                        ui.add_space(4.0);
                    }

                    // Every entry tied with rank 0 sits above the fold.
                    if top_count > 0 {
                        for (rank, participant) in state.participants.iter().enumerate() {
                            if participant.votes_count == top_count {
                                participant_row(ui, participant, rank + 1, &sms_number);
                            }
                        }
                        ui.separator();
                    }

                    if status_known {
                        for (rank, participant) in state.participants.iter().enumerate() {
                            if participant.id != top_id {
                                participant_row(ui, participant, rank + 1, &sms_number);
                            }
                        }
                    }

                    ui.add_space(8.0);
                    egui::CollapsingHeader::new("Activity").show(ui, |ui| {
                        for log in &state.logs {
                            ui.label(log);
                        }
                    });
                });
        }
    });

    egui::TopBottomPanel::bottom("footer").show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.label(format!(
                "Status: {}",
                if state.connected {
                    "Connected"
                } else {
                    "Not Connected"
                }
            ));
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(&state.status_message);
            });
        });
    });
}

fn participant_row(ui: &mut egui::Ui, participant: &VotingItem, rank: usize, sms_number: &str) {
    ui.horizontal(|ui| {
        ui.label(format!("{}.", rank));
        ui.vertical(|ui| {
            match &participant.url {
                Some(url) => {
                    ui.hyperlink_to(&participant.title, url);
                }
                None => {
                    ui.label(&participant.title);
                }
            }
            ui.label(format!(
                "{} votes | SMS {} to {}",
                participant.votes_count, participant.vote_code, sms_number
            ));
            ui.add(
                egui::ProgressBar::new(participant.votes_percents / 100.0)
                    .text(format!("{:.0}%", participant.votes_percents)),
            );
        });
    });
    ui.add_space(6.0);
}
