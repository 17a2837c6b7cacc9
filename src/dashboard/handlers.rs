//! Update handlers: commands, callback dispatch, text-input flows and the
//! admin-post detector.
//!
//! Multi-step flows (broadcast, manual entry, approval) run over a single
//! pending-input slot. Each admin text message consumes the slot, acts, and
//! either clears it or arms the next step. Non-admin chatter never touches it.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::dptree;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};
use teloxide::utils::command::BotCommands;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{BotConfig, MAX_PLAN_DAYS};
use crate::dashboard::actions::{CallbackAction, PlanChoice};
use crate::dashboard::views;
use crate::ledger::{plan_label, Ledger, LedgerError, ManagedSubscriber, OfflineRecord};
use crate::telegram::{ChannelClient, ChannelError, Profile};

/// Bot commands.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    #[command(description = "Start the bot")]
    Start,
    #[command(description = "Check your subscription status")]
    Status,
    #[command(description = "Open the admin dashboard")]
    Dashboard,
    #[command(description = "Cancel the current operation")]
    Cancel,
    #[command(description = "Skip the username step of a manual entry")]
    Nousername,
}

/// Who a plan/payment flow is being set up for.
#[derive(Debug, Clone)]
pub enum EntryTarget {
    /// A resolved channel member, added as a managed subscriber.
    Managed(Profile),
    /// An unresolvable person, added as an offline record.
    Offline { identifier: String },
}

impl EntryTarget {
    fn label(&self) -> String {
        match self {
            Self::Managed(profile) => profile.display_name.clone(),
            Self::Offline { identifier } => identifier.clone(),
        }
    }
}

/// The single in-flight admin interaction, if any.
#[derive(Debug, Clone)]
pub enum PendingInput {
    /// Waiting for the broadcast body.
    Broadcast,
    /// Waiting for a first name (manual entry step 1).
    FirstName,
    /// Waiting for a username or /nousername (manual entry step 2).
    Username { first_name: String },
    /// Waiting for a plan button after a failed member search.
    DetectionChoice {
        first_name: String,
        username: Option<String>,
    },
    /// Waiting for a plan button.
    PlanSelection { target: EntryTarget },
    /// Waiting for a custom day count.
    CustomDays { target: EntryTarget },
    /// Waiting for the payment proof text.
    Payment { target: EntryTarget, plan_days: i64 },
}

/// Shared handler state, injected through the dispatcher.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<BotConfig>,
    pub ledger: Ledger,
    pub client: ChannelClient,
    pub pending: Arc<Mutex<Option<PendingInput>>>,
}

impl AppState {
    #[must_use]
    pub fn new(config: Arc<BotConfig>, ledger: Ledger, client: ChannelClient) -> Self {
        Self {
            config,
            ledger,
            client,
            pending: Arc::new(Mutex::new(None)),
        }
    }
}

/// Builds the dispatcher handler tree.
pub fn schema() -> UpdateHandler<anyhow::Error> {
    let message_handler = Update::filter_message()
        .branch(teloxide::filter_command::<Command, _>().endpoint(handle_command))
        .branch(dptree::endpoint(handle_text_input));

    dptree::entry()
        .branch(message_handler)
        .branch(Update::filter_channel_post().endpoint(handle_channel_post))
        .branch(Update::filter_callback_query().endpoint(handle_callback))
        .branch(Update::filter_chat_member().endpoint(handle_chat_member))
}

async fn reply_html(bot: &Bot, chat_id: ChatId, text: &str) -> Result<()> {
    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

async fn reply_html_with_markup(
    bot: &Bot,
    chat_id: ChatId,
    text: &str,
    markup: InlineKeyboardMarkup,
) -> Result<()> {
    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(markup)
        .await?;
    Ok(())
}

async fn edit_html(
    bot: &Bot,
    q: &CallbackQuery,
    text: &str,
    markup: Option<InlineKeyboardMarkup>,
) -> Result<()> {
    let Some(message) = q.message.as_ref() else {
        return Ok(());
    };
    let request = bot
        .edit_message_text(message.chat().id, message.id(), text)
        .parse_mode(ParseMode::Html);
    match markup {
        Some(markup) => request.reply_markup(markup).await?,
        None => request.await?,
    };
    Ok(())
}

async fn handle_command(bot: Bot, msg: Message, cmd: Command, state: AppState) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let user_id = i64::try_from(user.id.0).unwrap_or(0);
    let is_admin = state.config.is_admin(user_id);

    match cmd {
        Command::Start => {
            if is_admin {
                bot.send_message(
                    msg.chat.id,
                    "Welcome, Admin! This is your Channel Guardian Bot.\n\
                     Use /dashboard to manage your subscribers.",
                )
                .await?;
            } else {
                bot.send_message(msg.chat.id, "This is a private management bot.")
                    .await?;
            }
        }
        Command::Status => match state.ledger.managed(user_id).await? {
            Some(sub) => reply_html(&bot, msg.chat.id, &views::status_text(&sub)).await?,
            None => {
                bot.send_message(
                    msg.chat.id,
                    "You are not currently subscribed or you are an offline record.",
                )
                .await?;
            }
        },
        Command::Dashboard => {
            if is_admin {
                reply_html_with_markup(
                    &bot,
                    msg.chat.id,
                    &views::dashboard_text(),
                    views::dashboard_markup(),
                )
                .await?;
            }
        }
        Command::Cancel => {
            if is_admin {
                state.pending.lock().await.take();
                bot.send_message(msg.chat.id, "Operation cancelled.").await?;
            }
        }
        Command::Nousername => {
            if !is_admin {
                return Ok(());
            }
            let mut pending = state.pending.lock().await;
            if let Some(PendingInput::Username { first_name }) = pending.take() {
                drop(pending);
                reply_html(
                    &bot,
                    msg.chat.id,
                    &format!(
                        "✅ No username noted for <b>{}</b>\n\n\
                         🔍 Now checking if this user is in your channel...",
                        views::escape(&first_name)
                    ),
                )
                .await?;
                run_member_search(&bot, msg.chat.id, &state, first_name, None).await?;
            }
        }
    }
    Ok(())
}

/// Free-text input from the admin, consumed by whatever flow is armed.
async fn handle_text_input(bot: Bot, msg: Message, state: AppState) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let user_id = i64::try_from(user.id.0).unwrap_or(0);
    if !state.config.is_admin(user_id) || !msg.chat.is_private() {
        return Ok(());
    }
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let taken = state.pending.lock().await.take();
    let Some(pending) = taken else {
        return Ok(());
    };

    match pending {
        PendingInput::Broadcast => run_broadcast(&bot, msg.chat.id, &state, text).await?,

        PendingInput::FirstName => {
            let first_name: String = text.trim().chars().take(50).collect();
            if first_name.is_empty() {
                state.pending.lock().await.replace(PendingInput::FirstName);
                bot.send_message(msg.chat.id, "Please provide a valid first name.")
                    .await?;
                return Ok(());
            }
            reply_html(
                &bot,
                msg.chat.id,
                &format!(
                    "✅ First name saved: <b>{}</b>\n\n\
                     Now please send me the <b>username</b> of the user (with or without @).\n\n\
                     Example: @john_doe or john_doe\n\n\
                     💡 <b>If the user has no username</b>, send the command: <code>/nousername</code>",
                    views::escape(&first_name)
                ),
            )
            .await?;
            state
                .pending
                .lock()
                .await
                .replace(PendingInput::Username { first_name });
        }

        PendingInput::Username { first_name } => {
            let username = text.trim().trim_start_matches('@').to_owned();
            if username.is_empty() {
                reply_html(
                    &bot,
                    msg.chat.id,
                    "Please provide a valid username or use <code>/nousername</code> if none.",
                )
                .await?;
                state
                    .pending
                    .lock()
                    .await
                    .replace(PendingInput::Username { first_name });
                return Ok(());
            }
            reply_html(
                &bot,
                msg.chat.id,
                &format!(
                    "✅ Username saved: <b>@{}</b>\n\
                     ✅ First name: <b>{}</b>\n\n\
                     🔍 Now checking if this user is in your channel...",
                    views::escape(&username),
                    views::escape(&first_name)
                ),
            )
            .await?;
            run_member_search(&bot, msg.chat.id, &state, first_name, Some(username)).await?;
        }

        PendingInput::CustomDays { target } => {
            let days = text.trim().parse::<i64>().ok();
            let Some(days) = days.filter(|d| (1..=MAX_PLAN_DAYS).contains(d)) else {
                bot.send_message(
                    msg.chat.id,
                    "Please enter a valid number between 1 and 36500.",
                )
                .await?;
                state
                    .pending
                    .lock()
                    .await
                    .replace(PendingInput::CustomDays { target });
                return Ok(());
            };
            bot.send_message(
                msg.chat.id,
                format!("Set custom plan to {days} days. Now, please reply with the payment proof details."),
            )
            .await?;
            state.pending.lock().await.replace(PendingInput::Payment {
                target,
                plan_days: days,
            });
        }

        PendingInput::Payment { target, plan_days } => {
            let payment_info: String = text.chars().take(1000).collect();
            finalize_entry(&bot, msg.chat.id, &state, target, plan_days, payment_info).await?;
        }

        // Plan and detection choices arrive as callbacks; stray text rearms
        // the slot untouched.
        other @ (PendingInput::PlanSelection { .. } | PendingInput::DetectionChoice { .. }) => {
            state.pending.lock().await.replace(other);
        }
    }
    Ok(())
}

async fn run_broadcast(bot: &Bot, chat_id: ChatId, state: &AppState, text: &str) -> Result<()> {
    let body: String = text.chars().take(4000).collect();
    let recipients = state.ledger.list_managed(true).await?;

    bot.send_message(
        chat_id,
        format!(
            "Starting broadcast to {} managed users... This may take a moment.",
            recipients.len()
        ),
    )
    .await?;

    let mut sent = 0_u32;
    let mut failed = 0_u32;
    for sub in recipients {
        match state.client.send_text(sub.user_id, &body).await {
            Ok(()) => sent += 1,
            Err(err) => {
                warn!("Broadcast to {} failed: {}", sub.user_id, err);
                failed += 1;
            }
        }
    }

    bot.send_message(
        chat_id,
        format!("Broadcast complete.\n- Sent successfully: {sent}\n- Failed: {failed}"),
    )
    .await?;
    Ok(())
}

/// Looks the person up in the channel and arms the matching next step.
async fn run_member_search(
    bot: &Bot,
    chat_id: ChatId,
    state: &AppState,
    first_name: String,
    username: Option<String>,
) -> Result<()> {
    let found = state
        .client
        .find_channel_member(&first_name, username.as_deref())
        .await;

    match found {
        Ok(Some(profile)) => {
            reply_html_with_markup(
                bot,
                chat_id,
                &format!(
                    "🎉 <b>User Found in Channel!</b>\n\n\
                     ✅ <b>Name:</b> {}\n\
                     ✅ <b>Username:</b> {}\n\
                     ✅ <b>User ID:</b> <code>{}</code>\n\n\
                     This user will be added as an <b>ACTIVE MEMBER</b> (not offline record).\n\n\
                     Please select a subscription plan:",
                    views::escape(&profile.display_name),
                    views::escape(&profile.username_label()),
                    profile.id
                ),
                views::managed_plan_markup(),
            )
            .await?;
            state
                .pending
                .lock()
                .await
                .replace(PendingInput::PlanSelection {
                    target: EntryTarget::Managed(profile),
                });
        }
        Ok(None) => {
            let username_label = username
                .as_ref()
                .map_or_else(|| "No username".to_owned(), |u| format!("@{u}"));
            reply_html_with_markup(
                bot,
                chat_id,
                &format!(
                    "❌ <b>User Not Found in Channel</b>\n\n\
                     The user with:\n\
                     📝 <b>Name:</b> {}\n\
                     📝 <b>Username:</b> {}\n\n\
                     Could not be found in the channel. Would you like to create an \
                     <b>offline record</b> for them instead?",
                    views::escape(&first_name),
                    views::escape(&username_label)
                ),
                views::detection_choice_markup(),
            )
            .await?;
            state
                .pending
                .lock()
                .await
                .replace(PendingInput::DetectionChoice {
                    first_name,
                    username,
                });
        }
        Err(err) => {
            warn!("Channel member search failed: {}", err);
            bot.send_message(chat_id, "Error searching the channel. Please try again.")
                .await?;
        }
    }
    Ok(())
}

/// Writes the finished entry to the ledger and confirms to the admin.
async fn finalize_entry(
    bot: &Bot,
    chat_id: ChatId,
    state: &AppState,
    target: EntryTarget,
    plan_days: i64,
    payment_info: String,
) -> Result<()> {
    let today = Utc::now().date_naive();

    match target {
        EntryTarget::Managed(profile) => {
            let record = ManagedSubscriber::new(
                profile.id,
                profile.display_name.clone(),
                profile.username.clone(),
                plan_days,
                today,
                payment_info,
            );
            state.ledger.upsert_managed(&record).await?;
            info!("Added managed subscriber {}", profile.id);
            reply_html(
                bot,
                chat_id,
                &format!(
                    "✅ <b>Success!</b>\n\
                     User {} is now a managed subscriber with a {} plan.",
                    views::escape(&profile.display_name),
                    plan_label(plan_days)
                ),
            )
            .await?;
        }
        EntryTarget::Offline { identifier } => {
            let record = OfflineRecord::new(identifier.clone(), plan_days, today, payment_info);
            let id = state.ledger.insert_offline(&record).await?;
            info!("Added offline record {}", id);
            reply_html(
                bot,
                chat_id,
                &format!(
                    "📝 <b>Offline Record Saved!</b>\n\n\
                     ✅ <b>Identifier:</b> {}\n\
                     ✅ <b>Plan:</b> {}\n\
                     ✅ <b>Status:</b> Offline Record\n\n\
                     This user was not detected in your channel, so it's saved as an offline record.",
                    views::escape(&identifier),
                    plan_label(plan_days)
                ),
            )
            .await?;
        }
    }
    Ok(())
}

/// Any post in the managed channel counts as admin activity for the day.
async fn handle_channel_post(msg: Message, state: AppState) -> Result<()> {
    if msg.chat.id.0 != state.config.channel_id {
        return Ok(());
    }
    let today = Utc::now().date_naive();
    state.ledger.record_admin_post(today).await?;
    debug!("Admin post recorded for {}", today);
    Ok(())
}

/// Alerts the admin when someone joins the managed channel.
async fn handle_chat_member(bot: Bot, update: ChatMemberUpdated, state: AppState) -> Result<()> {
    if update.chat.id.0 != state.config.channel_id {
        return Ok(());
    }
    if update.old_chat_member.is_present() || !update.new_chat_member.is_present() {
        return Ok(());
    }

    let user = &update.new_chat_member.user;
    if user.is_bot {
        return Ok(());
    }
    let profile = Profile {
        id: i64::try_from(user.id.0).unwrap_or(0),
        display_name: user.full_name(),
        username: user.username.clone(),
    };
    info!("{} ({}) joined the channel", profile.display_name, profile.id);

    bot.send_message(
        ChatId(state.config.admin_id),
        views::join_alert_text(&profile),
    )
    .parse_mode(ParseMode::Html)
    .reply_markup(views::join_alert_markup(profile.id, &profile.display_name))
    .await?;
    Ok(())
}

async fn handle_callback(bot: Bot, q: CallbackQuery, state: AppState) -> Result<()> {
    let from_id = i64::try_from(q.from.id.0).unwrap_or(0);
    if !state.config.is_admin(from_id) {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    }

    let action = q.data.as_deref().and_then(CallbackAction::parse);
    bot.answer_callback_query(q.id.clone()).await?;
    let Some(action) = action else {
        debug!("Ignoring unknown callback data: {:?}", q.data);
        return Ok(());
    };

    match action {
        CallbackAction::Stats => {
            let stats = state.ledger.stats().await?;
            edit_html(&bot, &q, &views::stats_text(&stats), Some(views::back_markup())).await?;
        }

        CallbackAction::ExpiringSoon => {
            let managed = state.ledger.expiring_managed().await?;
            let offline = state.ledger.expiring_offline().await?;
            edit_html(
                &bot,
                &q,
                &views::expiring_text(&managed, &offline),
                Some(views::back_markup()),
            )
            .await?;
        }

        CallbackAction::Broadcast => {
            state.pending.lock().await.replace(PendingInput::Broadcast);
            edit_html(
                &bot,
                &q,
                "Please send the message you want to broadcast to all MANAGED subscribers.",
                None,
            )
            .await?;
        }

        CallbackAction::CheckUser => {
            let entries = state.ledger.directory().await?;
            let (text, markup) = views::directory_page(&entries, 0);
            edit_html(&bot, &q, &text, Some(markup)).await?;
        }

        CallbackAction::UserPage(page) => {
            let entries = state.ledger.directory().await?;
            let (text, markup) = views::directory_page(&entries, page);
            edit_html(&bot, &q, &text, Some(markup)).await?;
        }

        CallbackAction::ShowManaged(user_id) => {
            let text = match state.ledger.managed(user_id).await? {
                Some(sub) => views::managed_detail_text(&sub),
                None => "Could not find the specified user or record.".to_owned(),
            };
            edit_html(&bot, &q, &text, Some(views::detail_markup())).await?;
        }

        CallbackAction::ShowOffline(id) => {
            let text = match state.ledger.offline(id).await? {
                Some(rec) => views::offline_detail_text(&rec),
                None => "Could not find the specified user or record.".to_owned(),
            };
            edit_html(&bot, &q, &text, Some(views::detail_markup())).await?;
        }

        CallbackAction::AddManualPrompt => {
            state.pending.lock().await.replace(PendingInput::FirstName);
            edit_html(
                &bot,
                &q,
                "🆕 <b>Adding Manual User Entry</b>\n\n\
                 Please send me the <b>first name</b> of the user you want to add.\n\n\
                 Example: John, Sarah, Alex",
                None,
            )
            .await?;
        }

        CallbackAction::BackToDashboard => {
            edit_html(
                &bot,
                &q,
                &views::dashboard_text(),
                Some(views::dashboard_markup()),
            )
            .await?;
        }

        CallbackAction::Approve(user_id) => {
            let profile = match state.client.profile(user_id).await {
                Ok(profile) => profile,
                Err(ChannelError::NotFound | ChannelError::Unreachable) => Profile {
                    id: user_id,
                    display_name: format!("User {user_id}"),
                    username: None,
                },
                Err(other) => return Err(other.into()),
            };
            edit_html(
                &bot,
                &q,
                &format!(
                    "Setting up subscription for: <b>{}</b>\n\n\
                     Please select the subscription plan:",
                    views::escape(&profile.display_name)
                ),
                Some(views::managed_plan_markup()),
            )
            .await?;
            state
                .pending
                .lock()
                .await
                .replace(PendingInput::PlanSelection {
                    target: EntryTarget::Managed(profile),
                });
        }

        CallbackAction::UserPlan(choice) | CallbackAction::OfflinePlan(choice) => {
            handle_plan_choice(&bot, &q, &state, choice).await?;
        }

        CallbackAction::CreateOffline => {
            let taken = state.pending.lock().await.take();
            let Some(PendingInput::DetectionChoice {
                first_name,
                username,
            }) = taken
            else {
                edit_html(&bot, &q, "This action has expired. Please start over.", None).await?;
                return Ok(());
            };
            let identifier = match username {
                Some(username) => format!("{first_name} (@{username})"),
                None => first_name,
            };
            edit_html(
                &bot,
                &q,
                &format!(
                    "📝 <b>Creating Offline Record</b>\n\n\
                     ✅ <b>Identifier:</b> {}\n\n\
                     Please select a subscription plan:",
                    views::escape(&identifier)
                ),
                Some(views::offline_plan_markup()),
            )
            .await?;
            state
                .pending
                .lock()
                .await
                .replace(PendingInput::PlanSelection {
                    target: EntryTarget::Offline { identifier },
                });
        }

        CallbackAction::RetrySearch => {
            state.pending.lock().await.replace(PendingInput::FirstName);
            edit_html(
                &bot,
                &q,
                "🔄 <b>Let's try again</b>\n\n\
                 Please send me the <b>first name</b> of the user you want to add.",
                None,
            )
            .await?;
        }

        CallbackAction::CancelManual => {
            state.pending.lock().await.take();
            edit_html(&bot, &q, "❌ Manual user addition cancelled.", None).await?;
        }

        CallbackAction::CancelApproval | CallbackAction::CancelOffline => {
            let taken = state.pending.lock().await.take();
            let text = match taken {
                Some(
                    PendingInput::PlanSelection { target }
                    | PendingInput::CustomDays { target }
                    | PendingInput::Payment { target, .. },
                ) => format!("❌ Cancelled for {}", views::escape(&target.label())),
                _ => "❌ Operation cancelled".to_owned(),
            };
            edit_html(&bot, &q, &text, None).await?;
        }

        CallbackAction::Extend { user_id, days } => {
            match state.ledger.extend_managed(user_id, days).await {
                Ok(()) => {
                    let name = state
                        .ledger
                        .managed(user_id)
                        .await?
                        .map_or_else(|| "Unknown User".to_owned(), |s| s.display_name);
                    edit_html(
                        &bot,
                        &q,
                        &format!(
                            "✅ <b>Subscription Extended</b>\n\n\
                             User: <b>{}</b> (<code>{}</code>)\n\
                             Extended by: <b>{} days</b>",
                            views::escape(&name),
                            user_id,
                            days
                        ),
                        None,
                    )
                    .await?;
                }
                Err(LedgerError::NotFound(_)) => {
                    edit_html(&bot, &q, "Could not find the specified user.", None).await?;
                }
                Err(other) => return Err(other.into()),
            }
        }

        CallbackAction::Info(user_id) => {
            handle_info(&bot, &q, &state, user_id).await?;
        }

        CallbackAction::DismissInfo => {
            if let Some(message) = q.message.as_ref() {
                bot.delete_message(message.chat().id, message.id()).await?;
            }
        }

        CallbackAction::Noop => {}
    }
    Ok(())
}

/// A plan button was pressed; asks for payment or a custom day count.
async fn handle_plan_choice(
    bot: &Bot,
    q: &CallbackQuery,
    state: &AppState,
    choice: PlanChoice,
) -> Result<()> {
    let taken = state.pending.lock().await.take();
    let Some(PendingInput::PlanSelection { target }) = taken else {
        edit_html(bot, q, "This action has expired. Please start over.", None).await?;
        return Ok(());
    };

    match choice {
        PlanChoice::Days(plan_days) => {
            edit_html(
                bot,
                q,
                &format!(
                    "Plan selected: <b>{}</b> for <b>{}</b>\n\n\
                     Please reply with the payment proof details.",
                    plan_label(plan_days),
                    views::escape(&target.label())
                ),
                None,
            )
            .await?;
            state
                .pending
                .lock()
                .await
                .replace(PendingInput::Payment { target, plan_days });
        }
        PlanChoice::Custom => {
            edit_html(
                bot,
                q,
                &format!(
                    "Creating custom plan for: <b>{}</b>\n\n\
                     Please enter the custom number of days (1-36500):",
                    views::escape(&target.label())
                ),
                None,
            )
            .await?;
            state
                .pending
                .lock()
                .await
                .replace(PendingInput::CustomDays { target });
        }
    }
    Ok(())
}

async fn handle_info(bot: &Bot, q: &CallbackQuery, state: &AppState, user_id: i64) -> Result<()> {
    let profile = match state.client.profile(user_id).await {
        Ok(profile) => profile,
        Err(ChannelError::NotFound | ChannelError::Unreachable) => {
            edit_html(
                bot,
                q,
                &format!(
                    "❌ Could not retrieve info for user <code>{user_id}</code>\n\n\
                     This user may have blocked the bot or deleted their account."
                ),
                None,
            )
            .await?;
            return Ok(());
        }
        Err(other) => return Err(other.into()),
    };

    let existing = state.ledger.managed(user_id).await?;
    let status = if existing.is_some() {
        "Already subscribed"
    } else {
        "Not subscribed"
    };

    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    if existing.is_none() {
        rows.push(vec![InlineKeyboardButton::callback(
            "✅ Approve User",
            CallbackAction::Approve(user_id).to_string(),
        )]);
    }
    rows.push(vec![InlineKeyboardButton::callback(
        "🔙 Dismiss",
        CallbackAction::DismissInfo.to_string(),
    )]);

    edit_html(
        bot,
        q,
        &format!(
            "👤 <b>User Information</b>\n\n\
             <b>Name:</b> {}\n\
             <b>Username:</b> {}\n\
             <b>User ID:</b> <code>{}</code>\n\
             <b>Status:</b> {}",
            views::escape(&profile.display_name),
            views::escape(&profile.username_label()),
            user_id,
            status
        ),
        Some(InlineKeyboardMarkup::new(rows)),
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_target_label() {
        let managed = EntryTarget::Managed(Profile {
            id: 1,
            display_name: "Alice".to_owned(),
            username: None,
        });
        let offline = EntryTarget::Offline {
            identifier: "Bob (@bob)".to_owned(),
        };
        assert_eq!(managed.label(), "Alice");
        assert_eq!(offline.label(), "Bob (@bob)");
    }

    #[test]
    fn test_command_parsing() {
        assert_eq!(Command::parse("/start", "bot").unwrap(), Command::Start);
        assert_eq!(Command::parse("/status", "bot").unwrap(), Command::Status);
        assert_eq!(
            Command::parse("/dashboard", "bot").unwrap(),
            Command::Dashboard
        );
        assert_eq!(
            Command::parse("/nousername", "bot").unwrap(),
            Command::Nousername
        );
        assert!(Command::parse("/unknown", "bot").is_err());
    }
}
