//! Interactive console
//!
//! Reads one command per line and prints its outcome. Nothing that goes
//! wrong after start-up ends the loop; errors become `error:` notices.

use std::io::{self, Write};

use chrono::{Local, NaiveDateTime};
use common::{ClientConfig, ClientError, ClientResult};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::availability::{AvailabilityView, ReservationTarget};
use crate::backend::{BandBackend, ReservationBackend, SessionBackend};
use crate::bands::BandManager;
use crate::cli::{self, BandCommand, Command, MemberCommand, UserCommand};
use crate::models::{Band, Id, Registration, User};
use crate::reservations::ReservationDraft;
use crate::session::SessionStore;

/// Result of one command: detail lines, then a one-line notice
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub lines: Vec<String>,
    pub notice: String,
}

impl Reply {
    fn notice(notice: impl Into<String>) -> Self {
        Self {
            lines: Vec::new(),
            notice: notice.into(),
        }
    }

    fn with_lines(lines: Vec<String>, notice: impl Into<String>) -> Self {
        Self {
            lines,
            notice: notice.into(),
        }
    }
}

/// What the loop does after a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Console session over any backend
pub struct Console<B> {
    store: SessionStore<B>,
    bands: BandManager<B>,
    view: Option<AvailabilityView<B>>,
    default_room: Option<String>,
}

impl<B> Console<B>
where
    B: SessionBackend + BandBackend + ReservationBackend + Clone,
{
    pub fn new(backend: B, config: &ClientConfig) -> Self {
        Self {
            store: SessionStore::new(backend.clone()),
            bands: BandManager::new(backend),
            view: None,
            default_room: config.default_room.clone(),
        }
    }

    pub fn store(&self) -> &SessionStore<B> {
        &self.store
    }

    /// Initial session check
    pub async fn mount(&mut self) {
        let session = self.store.mount().await;
        match session.user() {
            Some(user) => println!("ok: signed in as {}", user.username),
            None => println!("ok: not signed in; use `login <username>`"),
        }
    }

    /// Read commands from stdin until `quit` or end of input
    pub async fn run(&mut self) -> anyhow::Result<()> {
        self.run_with(BufReader::new(tokio::io::stdin())).await
    }

    pub async fn run_with<R: AsyncBufRead + Unpin>(&mut self, input: R) -> anyhow::Result<()> {
        let mut lines = input.lines();
        loop {
            print!("bandroom> ");
            io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                println!();
                break;
            };
            if self.handle_line(&line).await == Flow::Quit {
                break;
            }
        }

        info!("Console closed");
        Ok(())
    }

    /// Parse, execute and print one line
    pub async fn handle_line(&mut self, line: &str) -> Flow {
        if line.trim().is_empty() {
            return Flow::Continue;
        }

        let command = match cli::parse_line(line) {
            Ok(command) => command,
            Err(e) => {
                print!("{}", e.render());
                return Flow::Continue;
            }
        };
        if command == Command::Quit {
            return Flow::Quit;
        }

        match self.execute(command).await {
            Ok(reply) => {
                for line in &reply.lines {
                    println!("  {}", line);
                }
                println!("ok: {}", reply.notice);
            }
            Err(e) => println!("error: {}", e),
        }
        Flow::Continue
    }

    /// Run one parsed command
    pub async fn execute(&mut self, command: Command) -> ClientResult<Reply> {
        debug!("Executing {:?}", command);
        if command.requires_session() {
            self.store.require_user()?;
        }

        match command {
            Command::Login { username, password } => {
                let password = password_or_prompt(password)?;
                let user = self.store.login(&username, &password).await?;
                let notice = format!("signed in as {}", user.username);
                self.view = None;
                Ok(Reply::notice(notice))
            }
            Command::Register {
                username,
                email,
                national_id,
                password,
            } => {
                let password = password_or_prompt(password)?;
                let registration = Registration::new(&username, &email, &national_id, &password);
                let outcome = self.store.register(&registration).await?;
                Ok(Reply::notice(if outcome.requires_approval {
                    "account created; a UDP administrator must approve it before you can sign in"
                } else {
                    "account created; you can sign in now"
                }))
            }
            Command::Logout => {
                self.view = None;
                self.store.logout().await?;
                Ok(Reply::notice("signed out"))
            }
            Command::Whoami => Ok(match self.store.session().user() {
                Some(user) => Reply::with_lines(describe_user(user), user.username.clone()),
                None => Reply::notice("not signed in"),
            }),
            Command::Stats => {
                let stats = self.bands.stats().await?;
                Ok(Reply::with_lines(
                    vec![
                        format!("reservations: {}", stats.total_reservations),
                        format!("upcoming:     {}", stats.upcoming_reservations),
                        format!("bands:        {}", stats.band_count),
                    ],
                    "dashboard",
                ))
            }
            Command::Bands { command } => self.band_command(command).await,
            Command::Members { command } => {
                self.member_command(command.unwrap_or(MemberCommand::List))
                    .await
            }
            Command::Users {
                command: UserCommand::Search { term },
            } => {
                let users = self.bands.search_users(&cli::join_words(&term)).await?;
                let lines = users
                    .iter()
                    .map(|u| format!("{:>4}  {}  {}", u.id, u.username, u.email))
                    .collect();
                Ok(Reply::with_lines(lines, format!("{} users", users.len())))
            }
            Command::Rooms => {
                let rooms = self.store.backend().rooms().await?;
                let lines = rooms
                    .iter()
                    .map(|r| format!("{:>4}  {}  (capacity {})", r.id, r.name, r.capacity))
                    .collect();
                Ok(Reply::with_lines(lines, format!("{} rooms", rooms.len())))
            }
            Command::Reservations => {
                let reservations = self.store.backend().reservations().await?;
                let lines = reservations
                    .iter()
                    .map(|r| {
                        format!(
                            "{:>4}  room {}  {} - {}",
                            r.id,
                            r.room,
                            r.start_time.format("%Y-%m-%d %H:%M"),
                            r.end_time.format("%H:%M")
                        )
                    })
                    .collect();
                Ok(Reply::with_lines(
                    lines,
                    format!("{} reservations", reservations.len()),
                ))
            }
            Command::Week => {
                let view = self.view(None).await?;
                let lines = view
                    .days()
                    .iter()
                    .map(|day| {
                        let marker = match (day.selected, day.blocked) {
                            (true, _) => "selected",
                            (false, true) => "blocked",
                            (false, false) => "open",
                        };
                        format!("{}  {}", day.date.format("%a %Y-%m-%d"), marker)
                    })
                    .collect();
                let notice = format!("room {}", view.target().room);
                Ok(Reply::with_lines(lines, notice))
            }
            Command::Select { date } => {
                let view = self.view(None).await?;
                let date = cli::parse_day(&date, view.today())
                    .ok_or_else(|| ClientError::Validation(format!("Unknown date '{}'", date)))?;
                let slots = view.select_date(date, now())?;
                let open = slots.iter().filter(|s| s.is_available).count();
                Ok(Reply::with_lines(
                    slot_lines(view),
                    format!("{}: {} open slots", date, open),
                ))
            }
            Command::Slots => {
                let view = self.view(None).await?;
                let date = view
                    .selected()
                    .ok_or_else(|| ClientError::Validation("Select a day first".to_string()))?;
                Ok(Reply::with_lines(slot_lines(view), date.to_string()))
            }
            Command::Reserve { hour, room } => {
                let view = self.view(room.as_deref()).await?;
                let reservation = view.reserve(&hour).await?;
                Ok(Reply::notice(format!(
                    "reservation {} for {} in room {}",
                    reservation.id,
                    reservation.start_time.format("%Y-%m-%d %H:%M"),
                    reservation.room
                )))
            }
            Command::Book {
                start,
                end,
                room,
                guests,
            } => self.book(&start, &end, room.as_deref(), &guests).await,
            Command::Help => Ok(Reply::with_lines(
                cli::help().lines().map(str::to_string).collect(),
                "commands",
            )),
            Command::Quit => Ok(Reply::notice("bye")),
        }
    }

    async fn band_command(&mut self, command: BandCommand) -> ClientResult<Reply> {
        match command {
            BandCommand::List => {
                let bands = self.bands.list().await?;
                Ok(Reply::with_lines(band_lines(&bands), format!("{} bands", bands.len())))
            }
            BandCommand::Search { term } => {
                let bands = self.bands.search(&cli::join_words(&term)).await?;
                Ok(Reply::with_lines(band_lines(&bands), format!("{} bands", bands.len())))
            }
            BandCommand::Show { id } => {
                let band = self.bands.show(&Id::new(id)).await?;
                let mut lines = vec![format!(
                    "{}{}",
                    band.name,
                    if band.is_approved { "" } else { " (pending approval)" }
                )];
                lines.extend(band.members.iter().map(|m| format!("- {}", m.username)));
                Ok(Reply::with_lines(lines, format!("band {}", band.id)))
            }
            BandCommand::Create { name } => {
                self.store.require_udp()?;
                let created = self.bands.create(&cli::join_words(&name)).await;
                let band = self.store.after_mutation(created).await?;
                self.view = None;
                Ok(Reply::notice(format!("created band {} ({})", band.name, band.id)))
            }
            BandCommand::Rename { id, name } => {
                let renamed = self.bands.rename(&Id::new(id), &cli::join_words(&name)).await;
                let band = self.store.after_mutation(renamed).await?;
                Ok(Reply::notice(format!("band {} is now {}", band.id, band.name)))
            }
            BandCommand::Delete { id } => {
                let id = Id::new(id);
                let deleted = self.bands.delete(&id).await;
                self.store.after_mutation(deleted).await?;
                self.view = None;
                Ok(Reply::notice(format!("deleted band {}", id)))
            }
            BandCommand::Join { id } => {
                let id = Id::new(id);
                let joined = self.bands.join(&id).await;
                self.store.after_mutation(joined).await?;
                self.view = None;
                Ok(Reply::notice(format!("joined band {}", id)))
            }
        }
    }

    async fn member_command(&mut self, command: MemberCommand) -> ClientResult<Reply> {
        let band = self.current_band()?.id.clone();
        match command {
            MemberCommand::List => {
                let memberships = self.bands.members(&band).await?;
                let lines = memberships
                    .iter()
                    .map(|m| format!("{:>4}  {}", m.user.id, m.user.username))
                    .collect();
                Ok(Reply::with_lines(
                    lines,
                    format!("{} members", memberships.len()),
                ))
            }
            MemberCommand::Add { national_id } => {
                let candidate = self.bands.find_candidate(&national_id).await?;
                let added = self.bands.add_member(&band, &candidate.id).await;
                self.store.after_mutation(added).await?;
                Ok(Reply::notice(format!("added {}", candidate.username)))
            }
            MemberCommand::Remove { user_id } => {
                let user = Id::new(user_id);
                let removed = self.bands.remove_member(&band, &user).await;
                self.store.after_mutation(removed).await?;
                Ok(Reply::notice(format!("removed user {}", user)))
            }
        }
    }

    async fn book(
        &mut self,
        start: &str,
        end: &str,
        room: Option<&str>,
        guests: &[String],
    ) -> ClientResult<Reply> {
        let band = self.current_band()?.id.clone();

        let mut draft = ReservationDraft::new();
        draft.start_time = Some(time_arg(start)?);
        draft.end_time = Some(time_arg(end)?);
        draft.window()?;

        draft.room = Some(self.room(room).await?);
        for national_id in guests {
            draft.add_guest(self.guest(national_id).await?);
        }

        let reservation = draft.submit(self.store.backend(), &band).await?;
        Ok(Reply::notice(format!(
            "reservation {} from {} to {} with {} guests",
            reservation.id,
            reservation.start_time.format("%Y-%m-%d %H:%M"),
            reservation.end_time.format("%H:%M"),
            draft.guests().len()
        )))
    }

    async fn guest(&self, national_id: &str) -> ClientResult<User> {
        let mut found = self
            .store
            .backend()
            .users_by_national_id(national_id.trim())
            .await?;
        if found.len() != 1 {
            return Err(ClientError::NotFound(format!(
                "No single user with national id {}",
                national_id
            )));
        }
        Ok(found.remove(0))
    }

    fn current_band(&self) -> ClientResult<&Band> {
        self.store
            .require_user()?
            .current_band
            .as_ref()
            .ok_or_else(|| ClientError::Validation("Join or create a band first".to_string()))
    }

    /// Explicit room, then the configured one, then the first listed room
    async fn room(&self, explicit: Option<&str>) -> ClientResult<Id> {
        if let Some(room) = explicit.or(self.default_room.as_deref()) {
            return Ok(Id::new(room));
        }

        let rooms = self.store.backend().rooms().await?;
        rooms
            .into_iter()
            .next()
            .map(|room| room.id)
            .ok_or_else(|| ClientError::NotFound("No rooms available".to_string()))
    }

    /// The calendar for the current band, rebuilt when its target or day changes
    async fn view(&mut self, room: Option<&str>) -> ClientResult<&mut AvailabilityView<B>> {
        let band = self.current_band()?.id.clone();
        let current = self.view.as_ref().map(|v| (v.target().clone(), v.selected()));

        let room = match (room, &current) {
            (Some(room), _) => Id::new(room),
            (None, Some((target, _))) => target.room.clone(),
            (None, None) => self.room(None).await?,
        };
        let target = ReservationTarget { band, room };
        let today = now().date();

        let stale = match (&self.view, &current) {
            (Some(view), Some((existing, _))) => *existing != target || view.today() != today,
            _ => true,
        };
        if stale {
            debug!("Building calendar for band {} in room {}", target.band, target.room);
            let mut view = AvailabilityView::new(self.store.backend().clone(), target, today);
            if let Some(date) = current.and_then(|(_, selected)| selected) {
                view.keep_selection(date, now());
            }
            self.view = Some(view);
        }

        self.view
            .as_mut()
            .ok_or_else(|| ClientError::Validation("No calendar available".to_string()))
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn time_arg(raw: &str) -> ClientResult<NaiveDateTime> {
    cli::parse_time(raw).ok_or_else(|| {
        ClientError::Validation(format!("Unknown time '{}'; use YYYY-MM-DDTHH:MM", raw))
    })
}

fn password_or_prompt(password: Option<String>) -> ClientResult<String> {
    match password {
        Some(password) => Ok(password),
        None => rpassword::prompt_password("Password: ")
            .map_err(|e| ClientError::Validation(format!("Could not read password: {}", e))),
    }
}

fn describe_user(user: &User) -> Vec<String> {
    vec![
        format!("username: {}", user.username),
        format!("email:    {}", user.email),
        format!("UDP:      {}", if user.is_udp_affiliated { "yes" } else { "no" }),
        format!(
            "band:     {}",
            user.current_band
                .as_ref()
                .map(|b| b.name.as_str())
                .unwrap_or("none")
        ),
    ]
}

fn band_lines(bands: &[Band]) -> Vec<String> {
    bands
        .iter()
        .map(|b| format!("{:>4}  {}  ({} members)", b.id, b.name, b.members.len()))
        .collect()
}

fn slot_lines<B: ReservationBackend>(view: &AvailabilityView<B>) -> Vec<String> {
    view.slots()
        .iter()
        .map(|s| format!("{}  {}", s.label(), if s.is_available { "open" } else { "-" }))
        .collect()
}
