#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use crm_core::{Email, NewUser, Provider, User, UserId};

use crate::{
    Ack, ApiError, ApiResult, CreatedUser, CrmApi, EmailScope, GeneratedEmail, GeneratedEmails, GeneratedUsers, Op,
};

const FIRST_NAMES: [&str; 8] = ["Juan", "María", "Carlos", "Ana", "Luis", "Laura", "Pedro", "Sofía"];
const LAST_NAMES: [&str; 8] = ["García", "Rodríguez", "González", "Fernández", "López", "Martínez", "Sánchez", "Pérez"];

/// One recorded call against the mock, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    ListUsers,
    CreateUser(NewUser),
    DeleteUser(UserId),
    DeleteAllUsers,
    GenerateUsers(u32),
    ListEmails,
    DeleteAllEmails,
    GenerateEmails(EmailScope),
}

impl MockCall {
    pub fn op(&self) -> Op {
        match self {
            MockCall::ListUsers => Op::ListUsers,
            MockCall::CreateUser(_) => Op::CreateUser,
            MockCall::DeleteUser(_) => Op::DeleteUser,
            MockCall::DeleteAllUsers => Op::DeleteAllUsers,
            MockCall::GenerateUsers(_) => Op::GenerateUsers,
            MockCall::ListEmails => Op::ListEmails,
            MockCall::DeleteAllEmails => Op::DeleteAllEmails,
            MockCall::GenerateEmails(_) => Op::GenerateEmails,
        }
    }
}

#[derive(Default)]
struct MockState {
    users: Vec<User>,
    emails: Vec<Email>,
    next_user_id: UserId,
    next_email_id: i64,
    clock: i64,
    calls: Vec<MockCall>,
    failures: HashMap<Op, ApiError>,
    latency: HashMap<Op, Duration>,
}

impl MockState {
    fn tick(&mut self) -> Option<DateTime<Utc>> {
        self.clock += 1;
        DateTime::from_timestamp(1_700_000_000 + self.clock, 0)
    }

    fn add_user(&mut self, first: &str, last: &str, age: u32) -> User {
        self.next_user_id += 1;
        let user = User {
            id: self.next_user_id,
            first_name: first.to_string(),
            last_name: last.to_string(),
            age,
            created_at: self.tick(),
        };
        self.users.push(user.clone());
        user
    }
}

/// In-memory backend for tests: behaves like the REST backend, records every
/// call, and can be told to fail or to stall per operation.
#[derive(Default)]
pub struct MockApi {
    state: Mutex<MockState>,
}

impl MockApi {
    pub fn new() -> Self { Self::default() }

    pub fn with_users(self, users: Vec<User>) -> Self {
        {
            let mut st = self.lock();
            st.next_user_id = users.iter().map(|u| u.id).max().unwrap_or(0);
            st.users = users;
        }
        self
    }

    pub fn with_emails(self, emails: Vec<Email>) -> Self {
        {
            let mut st = self.lock();
            st.next_email_id = emails.iter().map(|e| e.id).max().unwrap_or(0);
            st.emails = emails;
        }
        self
    }

    /// Make every subsequent call of `op` fail with `err` (until [`MockApi::clear_failure`]).
    pub fn fail_on(&self, op: Op, err: ApiError) {
        self.lock().failures.insert(op, err);
    }

    pub fn clear_failure(&self, op: Op) {
        self.lock().failures.remove(&op);
    }

    /// Delay every call of `op` by `d` (tokio time, so paused clocks apply).
    pub fn delay_on(&self, op: Op, d: Duration) {
        self.lock().latency.insert(op, d);
    }

    pub fn calls(&self) -> Vec<MockCall> { self.lock().calls.clone() }

    pub fn call_count(&self, op: Op) -> usize {
        self.lock().calls.iter().filter(|c| c.op() == op).count()
    }

    pub fn users(&self) -> Vec<User> { self.lock().users.clone() }

    pub fn emails(&self) -> Vec<Email> { self.lock().emails.clone() }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not wedge the others.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record the call, wait out any configured latency, then report a configured failure.
    async fn enter(&self, call: MockCall) -> ApiResult<()> {
        let op = call.op();
        let delay = {
            let mut st = self.lock();
            st.calls.push(call);
            st.latency.get(&op).copied()
        };
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        match self.lock().failures.get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl CrmApi for MockApi {
    async fn list_users(&self) -> ApiResult<Vec<User>> {
        self.enter(MockCall::ListUsers).await?;
        Ok(self.users())
    }

    async fn create_user(&self, user: NewUser) -> ApiResult<CreatedUser> {
        self.enter(MockCall::CreateUser(user.clone())).await?;
        user.validate()?;
        let created = self.lock().add_user(&user.first_name, &user.last_name, user.age);
        Ok(CreatedUser { id: created.id, message: Some("User added".to_string()) })
    }

    async fn delete_user(&self, id: UserId) -> ApiResult<Ack> {
        self.enter(MockCall::DeleteUser(id)).await?;
        let mut st = self.lock();
        st.users.retain(|u| u.id != id);
        st.emails.retain(|e| e.user_id != id);
        Ok(Ack { message: Some("User deleted".to_string()) })
    }

    async fn delete_all_users(&self) -> ApiResult<Ack> {
        self.enter(MockCall::DeleteAllUsers).await?;
        let mut st = self.lock();
        st.users.clear();
        st.emails.clear();
        Ok(Ack { message: Some("All users deleted".to_string()) })
    }

    async fn generate_users(&self, count: u32) -> ApiResult<GeneratedUsers> {
        self.enter(MockCall::GenerateUsers(count)).await?;
        let mut st = self.lock();
        let mut users = Vec::with_capacity(count as usize);
        for i in 0..count as usize {
            let first = FIRST_NAMES[i % FIRST_NAMES.len()];
            let last = LAST_NAMES[(i / FIRST_NAMES.len()) % LAST_NAMES.len()];
            let age = 18 + (i as u32 * 7) % 63;
            users.push(st.add_user(first, last, age));
        }
        let message = Some(format!("Generated {} random users", users.len()));
        Ok(GeneratedUsers { users, message })
    }

    async fn list_emails(&self) -> ApiResult<Vec<Email>> {
        self.enter(MockCall::ListEmails).await?;
        Ok(self.emails())
    }

    async fn delete_all_emails(&self) -> ApiResult<Ack> {
        self.enter(MockCall::DeleteAllEmails).await?;
        self.lock().emails.clear();
        Ok(Ack { message: Some("All emails deleted".to_string()) })
    }

    async fn generate_emails(&self, scope: EmailScope) -> ApiResult<GeneratedEmails> {
        self.enter(MockCall::GenerateEmails(scope.clone())).await?;
        let mut st = self.lock();
        if st.users.is_empty() {
            return Err(ApiError::Status { status: 400, message: "No users to generate emails for".to_string() });
        }
        let providers = scope.providers();
        let owners: Vec<User> = st.users.clone();
        let mut generated = Vec::with_capacity(owners.len() * providers.len());
        for u in owners.iter() {
            for p in providers.iter() {
                let address = address_for(p, &u.first_name, &u.last_name);
                st.next_email_id += 1;
                let created_at = st.tick();
                let email = Email {
                    id: st.next_email_id,
                    user_id: u.id,
                    provider: p.clone(),
                    address: address.clone(),
                    created_at,
                    first_name: u.first_name.clone(),
                    last_name: u.last_name.clone(),
                };
                st.emails.push(email);
                generated.push(GeneratedEmail { user_id: u.id, provider: p.clone(), address });
            }
        }
        let message = Some(format!("Generated {} email addresses", generated.len()));
        Ok(GeneratedEmails { emails: generated, elapsed_secs: Some(0.0), message })
    }
}

/// Address formats the backend uses per provider.
fn address_for(provider: &Provider, first: &str, last: &str) -> String {
    let clean = |s: &str| s.chars().filter(char::is_ascii_alphabetic).collect::<String>().to_ascii_lowercase();
    let first = clean(first);
    let last = clean(last);
    let fi = first.chars().next().unwrap_or('a');
    let li = last.chars().next().unwrap_or('b');
    match provider {
        Provider::Gmail => format!("{first}.{last}@gmail.com"),
        Provider::Outlook => format!("{first}_{last}@outlook.com"),
        Provider::Hotmail => format!("{fi}{last}@hotmail.com"),
        Provider::Yahoo => format!("{first}-{last}@yahoo.com"),
        Provider::Empresa => format!("{fi}.{last}@empresa.com"),
        Provider::Custom1 => format!("{first}{last}@custom.com"),
        Provider::Custom2 => format!("{last}.{first}@company.com"),
        Provider::Custom3 => format!("{fi}{li}@corporate.com"),
        Provider::Other(tag) => format!("{first}.{last}@{tag}.com"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn generation_and_cascade() {
        let api = MockApi::new();
        let out = api.generate_users(3).await.expect("generate");
        assert_eq!(out.users.len(), 3);
        let scope = EmailScope::selected([Provider::Gmail, Provider::Custom3]).expect("scope");
        let emails = api.generate_emails(scope).await.expect("emails");
        assert_eq!(emails.emails.len(), 6);
        assert_eq!(emails.emails[0].address, "juan.garca@gmail.com");
        api.delete_user(out.users[0].id).await.expect("delete");
        assert_eq!(api.users().len(), 2);
        assert_eq!(api.emails().len(), 4);
    }

    #[tokio::test]
    async fn configured_failure_is_returned_and_recorded() {
        let api = MockApi::new();
        api.fail_on(Op::ListUsers, ApiError::Network("down".into()));
        assert_eq!(api.list_users().await, Err(ApiError::Network("down".into())));
        assert_eq!(api.call_count(Op::ListUsers), 1);
        api.clear_failure(Op::ListUsers);
        assert_eq!(api.list_users().await, Ok(Vec::new()));
    }

    #[tokio::test]
    async fn emails_need_users() {
        let api = MockApi::new();
        let err = api.generate_emails(EmailScope::All).await.expect_err("no users");
        assert_eq!(err.message(), "No users to generate emails for");
    }
}
