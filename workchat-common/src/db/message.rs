use chrono::{DateTime, Utc};
use diesel::{
    dsl, BoolExpressionMethods, ExpressionMethods, JoinOnDsl, OptionalExtension, QueryDsl,
    RunQueryDsl, SelectableHelper,
};
use std::collections::{HashMap, HashSet};

use crate::db::{DaoError, DbThreadPool};
use crate::models::message::{ConversationSummary, Message, MessageWithSender, NewMessage};
use crate::models::message_read::MessageRead;
use crate::models::user::UserSummary;
use crate::schema::message_reads as read_fields;
use crate::schema::message_reads::dsl::message_reads;
use crate::schema::messages as message_fields;
use crate::schema::messages::dsl::messages;
use crate::schema::users as user_fields;
use crate::schema::users::dsl::users;

macro_rules! with_sender_columns {
    () => {
        (
            message_fields::id,
            message_fields::content,
            message_fields::sent_timestamp,
            message_fields::sent_by_user_id,
            user_fields::first_name,
            user_fields::last_name,
            message_fields::received_by_user_id,
            message_fields::department_id,
        )
    };
}

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    pub fn create_message(&self, new_message: &NewMessage) -> Result<i32, DaoError> {
        Ok(dsl::insert_into(messages)
            .values(new_message)
            .returning(message_fields::id)
            .get_result(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_message(&self, message_id: i32) -> Result<Message, DaoError> {
        Ok(messages
            .find(message_id)
            .select(Message::as_select())
            .get_result(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_message_with_sender(&self, message_id: i32) -> Result<MessageWithSender, DaoError> {
        Ok(messages
            .inner_join(users.on(message_fields::sent_by_user_id.eq(user_fields::id)))
            .filter(message_fields::id.eq(message_id))
            .select(with_sender_columns!())
            .get_result(&mut self.db_thread_pool.get()?)?)
    }

    /// Direct messages between two users in the order they were sent.
    pub fn get_conversation(
        &self,
        user_id: i32,
        other_user_id: i32,
    ) -> Result<Vec<MessageWithSender>, DaoError> {
        Ok(messages
            .inner_join(users.on(message_fields::sent_by_user_id.eq(user_fields::id)))
            .filter(
                message_fields::sent_by_user_id
                    .eq(user_id)
                    .and(message_fields::received_by_user_id.eq(other_user_id))
                    .or(message_fields::sent_by_user_id
                        .eq(other_user_id)
                        .and(message_fields::received_by_user_id.eq(user_id))),
            )
            .select(with_sender_columns!())
            .order((
                message_fields::sent_timestamp.asc(),
                message_fields::id.asc(),
            ))
            .load(&mut self.db_thread_pool.get()?)?)
    }

    /// The most recent direct message with each user this user has talked to, newest
    /// conversation first.
    pub fn get_conversations(&self, user_id: i32) -> Result<Vec<ConversationSummary>, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        let direct_messages = messages
            .select(Message::as_select())
            .filter(
                message_fields::sent_by_user_id
                    .eq(user_id)
                    .and(message_fields::received_by_user_id.is_not_null())
                    .or(message_fields::received_by_user_id.eq(user_id)),
            )
            .order((
                message_fields::sent_timestamp.desc(),
                message_fields::id.desc(),
            ))
            .load::<Message>(&mut db_connection)?;

        let mut latest = Vec::new();
        let mut seen = HashSet::new();

        for message in direct_messages {
            let counterpart = if message.sent_by_user_id == user_id {
                message.received_by_user_id
            } else {
                Some(message.sent_by_user_id)
            };

            let Some(counterpart) = counterpart else {
                continue;
            };

            if seen.insert(counterpart) {
                latest.push((counterpart, message));
            }
        }

        let counterpart_ids = latest.iter().map(|(id, _)| *id).collect::<Vec<_>>();
        let counterparts = users
            .filter(user_fields::id.eq_any(counterpart_ids))
            .select((
                user_fields::id,
                user_fields::first_name,
                user_fields::last_name,
            ))
            .load::<UserSummary>(&mut db_connection)?
            .into_iter()
            .map(|user| (user.id, user))
            .collect::<HashMap<_, _>>();

        Ok(latest
            .into_iter()
            .filter_map(|(counterpart, last_message)| {
                counterparts
                    .get(&counterpart)
                    .cloned()
                    .map(|user| ConversationSummary { user, last_message })
            })
            .collect())
    }

    /// Only the sender may edit. Returns `None` if the message does not exist or was sent
    /// by someone else.
    pub fn edit_message(
        &self,
        message_id: i32,
        sender_id: i32,
        content: &str,
    ) -> Result<Option<Message>, DaoError> {
        Ok(dsl::update(
            messages
                .filter(message_fields::id.eq(message_id))
                .filter(message_fields::sent_by_user_id.eq(sender_id)),
        )
        .set((
            message_fields::content.eq(content),
            message_fields::edited_timestamp.eq(Some(Utc::now())),
        ))
        .returning(Message::as_returning())
        .get_result(&mut self.db_thread_pool.get()?)
        .optional()?)
    }

    /// Only the sender may delete. Returns the deleted message.
    pub fn delete_message(
        &self,
        message_id: i32,
        sender_id: i32,
    ) -> Result<Option<Message>, DaoError> {
        Ok(dsl::delete(
            messages
                .filter(message_fields::id.eq(message_id))
                .filter(message_fields::sent_by_user_id.eq(sender_id)),
        )
        .returning(Message::as_returning())
        .get_result(&mut self.db_thread_pool.get()?)
        .optional()?)
    }

    /// Records that `user_id` has read the message. A repeat read moves the read time.
    pub fn mark_read(
        &self,
        message_id: i32,
        user_id: i32,
        read_at: DateTime<Utc>,
    ) -> Result<(), DaoError> {
        let read = MessageRead {
            message_id,
            user_id,
            read_timestamp: read_at,
        };

        dsl::insert_into(message_reads)
            .values(&read)
            .on_conflict((read_fields::message_id, read_fields::user_id))
            .do_update()
            .set(read_fields::read_timestamp.eq(read_at))
            .execute(&mut self.db_thread_pool.get()?)?;

        Ok(())
    }

    pub fn get_reads(&self, message_id: i32) -> Result<Vec<MessageRead>, DaoError> {
        Ok(message_reads
            .filter(read_fields::message_id.eq(message_id))
            .load(&mut self.db_thread_pool.get()?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::db::test_utils;
    use crate::models::message::MessageRecipient;

    fn dao() -> Dao {
        Dao::new(test_utils::db_pool())
    }

    #[test]
    fn test_conversation_order_and_sender_names() {
        let alice = test_utils::create_user(false);
        let bob = test_utils::create_user(false);
        let carol = test_utils::create_user(false);
        let dao = dao();

        let first = dao
            .create_message(&NewMessage::new("Hi Bob", alice.id, MessageRecipient::User(bob.id)))
            .unwrap();
        let second = dao
            .create_message(&NewMessage::new("Hi Alice", bob.id, MessageRecipient::User(alice.id)))
            .unwrap();
        dao.create_message(&NewMessage::new("Hi Carol", alice.id, MessageRecipient::User(carol.id)))
            .unwrap();

        let conversation = dao.get_conversation(alice.id, bob.id).unwrap();
        assert_eq!(
            conversation.iter().map(|m| m.id).collect::<Vec<_>>(),
            vec![first, second]
        );
        assert_eq!(conversation[1].sender_first_name, "Test");
        assert_eq!(conversation[1].sent_by_user_id, bob.id);

        let with_sender = dao.get_message_with_sender(first).unwrap();
        assert_eq!(with_sender.content, "Hi Bob");
        assert_eq!(with_sender.received_by_user_id, Some(bob.id));
    }

    #[test]
    fn test_latest_message_per_counterpart() {
        let alice = test_utils::create_user(false);
        let bob = test_utils::create_user(false);
        let carol = test_utils::create_user(false);
        let department_id = test_utils::create_department();
        let dao = dao();

        dao.create_message(&NewMessage::new("One", alice.id, MessageRecipient::User(bob.id)))
            .unwrap();
        dao.create_message(&NewMessage::new("Two", carol.id, MessageRecipient::User(alice.id)))
            .unwrap();
        let latest_with_bob = dao
            .create_message(&NewMessage::new("Three", bob.id, MessageRecipient::User(alice.id)))
            .unwrap();
        dao.create_message(&NewMessage::new(
            "Group",
            alice.id,
            MessageRecipient::Department(department_id),
        ))
        .unwrap();

        let conversations = dao.get_conversations(alice.id).unwrap();
        assert_eq!(conversations.len(), 2);
        assert_eq!(conversations[0].user.id, bob.id);
        assert_eq!(conversations[0].last_message.id, latest_with_bob);
        assert_eq!(conversations[1].user.id, carol.id);
        assert_eq!(conversations[1].last_message.content, "Two");
    }

    #[test]
    fn test_only_sender_edits_and_deletes() {
        let alice = test_utils::create_user(false);
        let bob = test_utils::create_user(false);
        let dao = dao();

        let message_id = dao
            .create_message(&NewMessage::new("Draft", alice.id, MessageRecipient::User(bob.id)))
            .unwrap();

        assert!(dao.edit_message(message_id, bob.id, "Hijacked").unwrap().is_none());

        let edited = dao.edit_message(message_id, alice.id, "Final").unwrap().unwrap();
        assert_eq!(edited.content, "Final");
        assert!(edited.edited_timestamp.is_some());

        assert!(dao.delete_message(message_id, bob.id).unwrap().is_none());
        assert!(dao.delete_message(message_id, alice.id).unwrap().is_some());
        assert!(dao.get_message(message_id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_mark_read_upserts() {
        let alice = test_utils::create_user(false);
        let bob = test_utils::create_user(false);
        let dao = dao();

        let message_id = dao
            .create_message(&NewMessage::new("Read me", alice.id, MessageRecipient::User(bob.id)))
            .unwrap();

        let first_read = Utc::now() - chrono::Duration::minutes(5);
        dao.mark_read(message_id, bob.id, first_read).unwrap();
        dao.mark_read(message_id, bob.id, Utc::now()).unwrap();

        let reads = dao.get_reads(message_id).unwrap();
        assert_eq!(reads.len(), 1);
        assert_eq!(reads[0].user_id, bob.id);
        assert!(reads[0].read_timestamp > first_read);
    }
}
