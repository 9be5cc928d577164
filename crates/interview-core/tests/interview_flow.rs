use interview_core::mocks::{ChannelOutbound, MockGenerator, RecordingSink};
use interview_core::session::{InterviewState, ReleaseType};
use interview_core::{texts, AllowList, InterviewEngine};
use protocol::{labels, ChoiceSet, InboundEvent, Reply, UserRef};
use tokio::sync::mpsc;

struct Harness {
    engine: InterviewEngine<MockGenerator, RecordingSink, ChannelOutbound>,
    rx: mpsc::Receiver<Reply>,
}

impl Harness {
    fn new() -> Self {
        Self::with_generator(MockGenerator::ok("Here is your post."))
    }

    fn with_generator(generator: MockGenerator) -> Self {
        let (tx, rx) = mpsc::channel(64);
        let engine = InterviewEngine::new(
            generator,
            RecordingSink::new(),
            ChannelOutbound(tx),
            AllowList::open(),
        );
        Self { engine, rx }
    }

    async fn reset(&self, user: &UserRef) {
        self.engine.handle(InboundEvent::reset(user.clone())).await.unwrap();
    }

    async fn text(&self, user: &UserRef, text: &str) {
        self.engine.handle(InboundEvent::text(user.clone(), text)).await.unwrap();
    }

    async fn photo(&self, user: &UserRef, file_ref: &str) {
        self.engine.handle(InboundEvent::photo(user.clone(), file_ref)).await.unwrap();
    }

    async fn reply(&mut self) -> Reply {
        self.rx.recv().await.expect("expected a reply")
    }

    fn state(&self, user: &UserRef) -> InterviewState {
        self.engine.store().get(user.id).expect("expected an active session").state
    }
}

fn operator() -> UserRef {
    UserRef::with_handle(100, "operator")
}

#[tokio::test]
async fn reset_greets_and_opens_at_awaiting_hook() {
    let mut h = Harness::new();
    let user = operator();

    h.reset(&user).await;
    let reply = h.reply().await;
    assert_eq!(reply.user_id, user.id);
    assert_eq!(reply.text, texts::GREETING);
    assert_eq!(reply.choices, Some(ChoiceSet::HookSkip));
    assert_eq!(h.state(&user), InterviewState::AwaitingHook);
}

#[tokio::test]
async fn reset_from_mid_flow_clears_every_field() {
    let mut h = Harness::new();
    let user = operator();

    h.reset(&user).await;
    h.text(&user, "Playing a secret show downtown").await;
    h.photo(&user, "file-1").await;
    for _ in 0..3 {
        h.reply().await;
    }

    h.reset(&user).await;
    h.reply().await;

    let session = h.engine.store().get(user.id).unwrap();
    assert_eq!(session.state, InterviewState::AwaitingHook);
    assert_eq!(session.news_hook, None);
    assert_eq!(session.link, None);
    assert_eq!(session.release_type, None);
    assert_eq!(session.topic, None);
    assert!(session.photos.is_empty());
}

#[tokio::test]
async fn no_token_routes_to_topic_choice() {
    // Scenario A.
    let mut h = Harness::new();
    let user = operator();

    h.reset(&user).await;
    h.reply().await;
    h.text(&user, "no").await;

    let reply = h.reply().await;
    assert_eq!(reply.choices, Some(ChoiceSet::Topics));
    assert_eq!(h.state(&user), InterviewState::AwaitingTopicChoice);
    assert_eq!(h.engine.store().get(user.id).unwrap().news_hook, None);
}

#[tokio::test]
async fn empty_input_counts_as_no_hook() {
    let mut h = Harness::new();
    let user = operator();

    h.reset(&user).await;
    h.reply().await;
    h.text(&user, "   ").await;
    h.reply().await;

    assert_eq!(h.state(&user), InterviewState::AwaitingTopicChoice);
}

#[tokio::test]
async fn hook_with_link_asks_release_type() {
    // Scenario B.
    let mut h = Harness::new();
    let user = operator();

    h.reset(&user).await;
    h.reply().await;
    h.text(&user, "Big sale at https://example.com/x tomorrow").await;

    let reply = h.reply().await;
    assert_eq!(reply.choices, Some(ChoiceSet::ReleaseType));

    let session = h.engine.store().get(user.id).unwrap();
    assert_eq!(session.state, InterviewState::AwaitingReleaseType);
    assert_eq!(session.link.as_deref(), Some("https://example.com/x"));
    assert_eq!(session.news_hook.as_deref(), Some("Big sale at tomorrow"));
}

#[tokio::test]
async fn bare_link_gets_fallback_hook() {
    // Scenario C.
    let mut h = Harness::new();
    let user = operator();

    h.reset(&user).await;
    h.reply().await;
    h.text(&user, "https://example.com").await;
    h.reply().await;

    let session = h.engine.store().get(user.id).unwrap();
    assert_eq!(session.link.as_deref(), Some("https://example.com"));
    assert_eq!(session.news_hook.as_deref(), Some("promotion via link"));
    assert_eq!(session.state, InterviewState::AwaitingReleaseType);
}

#[tokio::test]
async fn plain_hook_skips_topic_and_release_type() {
    let mut h = Harness::new();
    let user = operator();

    h.reset(&user).await;
    h.reply().await;
    h.text(&user, "Signed with a new label today").await;

    let reply = h.reply().await;
    assert_eq!(reply.choices, Some(ChoiceSet::Finish));

    let session = h.engine.store().get(user.id).unwrap();
    assert_eq!(session.state, InterviewState::AwaitingPhotoOrFinish);
    assert_eq!(session.news_hook.as_deref(), Some("Signed with a new label today"));
    assert_eq!(session.link, None);
    assert_eq!(session.release_type, None);
}

#[tokio::test]
async fn release_type_rejects_anything_but_the_two_labels() {
    let mut h = Harness::new();
    let user = operator();

    h.reset(&user).await;
    h.reply().await;
    h.text(&user, "https://example.com/track").await;
    h.reply().await;

    h.text(&user, "maybe?").await;
    let reply = h.reply().await;
    assert_eq!(reply.choices, Some(ChoiceSet::ReleaseType));
    assert_eq!(h.state(&user), InterviewState::AwaitingReleaseType);

    h.text(&user, labels::PREMIERE).await;
    h.reply().await;

    let session = h.engine.store().get(user.id).unwrap();
    assert_eq!(session.release_type, Some(ReleaseType::Premiere));
    assert_eq!(session.state, InterviewState::AwaitingPhotoOrFinish);
    // Release type only ever rides along with a link.
    assert!(session.link.is_some());
}

#[tokio::test]
async fn fixed_topic_is_stored_canonically() {
    let mut h = Harness::new();
    let user = operator();

    h.reset(&user).await;
    h.reply().await;
    h.text(&user, "no").await;
    h.reply().await;

    h.text(&user, "something else entirely").await;
    let reply = h.reply().await;
    assert_eq!(reply.choices, Some(ChoiceSet::Topics));
    assert_eq!(h.state(&user), InterviewState::AwaitingTopicChoice);

    h.text(&user, labels::TOPICS[1]).await;
    h.reply().await;

    let session = h.engine.store().get(user.id).unwrap();
    assert_eq!(session.topic.as_deref(), Some(labels::TOPICS[1]));
    assert_eq!(session.state, InterviewState::AwaitingPhotoOrFinish);
}

#[tokio::test]
async fn custom_topic_takes_next_message_verbatim() {
    let mut h = Harness::new();
    let user = operator();

    h.reset(&user).await;
    h.reply().await;
    h.text(&user, "no").await;
    h.reply().await;
    h.text(&user, labels::CUSTOM_TOPIC).await;

    let reply = h.reply().await;
    assert_eq!(reply.text, texts::ASK_CUSTOM_TOPIC);
    assert_eq!(reply.choices, None);
    assert_eq!(h.state(&user), InterviewState::AwaitingTopicCustom);
    assert_eq!(h.engine.store().get(user.id).unwrap().topic, None);

    h.text(&user, "  collab with the venue crew  ").await;
    h.reply().await;

    let session = h.engine.store().get(user.id).unwrap();
    assert_eq!(session.topic.as_deref(), Some("collab with the venue crew"));
    assert_eq!(session.state, InterviewState::AwaitingPhotoOrFinish);
}

#[tokio::test]
async fn fourth_photo_is_rejected() {
    // Scenario D.
    let mut h = Harness::new();
    let user = operator();

    h.reset(&user).await;
    h.reply().await;
    h.text(&user, "Album drop").await;
    h.reply().await;

    for i in 1..=3 {
        h.photo(&user, &format!("file-{}", i)).await;
        let reply = h.reply().await;
        assert_eq!(reply.text, texts::photo_added(i));
    }

    h.photo(&user, "file-4").await;
    let reply = h.reply().await;
    assert_eq!(reply.text, texts::PHOTO_CAP);

    let session = h.engine.store().get(user.id).unwrap();
    assert_eq!(session.photos, vec!["file-1", "file-2", "file-3"]);
    assert_eq!(session.state, InterviewState::AwaitingPhotoOrFinish);
}

#[tokio::test]
async fn photo_at_hook_step_just_reprompts() {
    let mut h = Harness::new();
    let user = operator();

    h.reset(&user).await;
    h.reply().await;
    h.photo(&user, "file-early").await;

    let reply = h.reply().await;
    assert_eq!(reply.text, texts::GREETING);
    let session = h.engine.store().get(user.id).unwrap();
    assert!(session.photos.is_empty());
    assert_eq!(session.state, InterviewState::AwaitingHook);
}

#[tokio::test]
async fn stray_text_at_photo_step_reprompts() {
    let mut h = Harness::new();
    let user = operator();

    h.reset(&user).await;
    h.reply().await;
    h.text(&user, "Album drop").await;
    h.reply().await;

    h.text(&user, "is this thing on?").await;
    let reply = h.reply().await;
    assert_eq!(reply.text, texts::ASK_PHOTOS);
    assert_eq!(h.state(&user), InterviewState::AwaitingPhotoOrFinish);
}

#[tokio::test]
async fn events_without_session_do_not_create_one() {
    let mut h = Harness::new();
    let user = operator();

    h.text(&user, "hello?").await;
    let reply = h.reply().await;
    assert_eq!(reply.text, texts::PROMPT_START);

    h.photo(&user, "file-x").await;
    // Photos with no session are dropped silently.
    assert!(h.rx.try_recv().is_err());
    assert!(h.engine.store().is_empty());
}

#[tokio::test]
async fn allow_list_blocks_outsiders_before_any_transition() {
    let (tx, mut rx) = mpsc::channel(8);
    let engine = InterviewEngine::new(
        MockGenerator::ok("unused"),
        RecordingSink::new(),
        ChannelOutbound(tx),
        AllowList::from_ids([1]),
    );

    let outsider = UserRef::new(2);
    engine.handle(InboundEvent::reset(outsider.clone())).await.unwrap();

    let reply = rx.recv().await.unwrap();
    assert_eq!(reply.text, texts::ACCESS_RESTRICTED);
    assert!(engine.store().is_empty());

    let insider = UserRef::new(1);
    engine.handle(InboundEvent::reset(insider.clone())).await.unwrap();
    assert!(engine.store().get(insider.id).is_some());
}

#[tokio::test]
async fn users_are_isolated_from_each_other() {
    let mut h = Harness::new();
    let alice = UserRef::with_handle(1, "alice");
    let bob = UserRef::with_handle(2, "bob");

    h.reset(&alice).await;
    h.reset(&bob).await;
    h.text(&alice, "no").await;
    h.text(&bob, "Touring in spring").await;
    for _ in 0..4 {
        h.reply().await;
    }

    assert_eq!(h.state(&alice), InterviewState::AwaitingTopicChoice);
    assert_eq!(h.state(&bob), InterviewState::AwaitingPhotoOrFinish);
}
