use std::sync::Arc;

use async_trait::async_trait;
use interaction_hub_registry::{
    AccessLevel, Category, CommandDescriptor, CommandPolicy, ExecutionEnvironment, OptionKind,
    OptionSchema, Permission, RoutingPath, SlashCommandDescriptor,
};
use rand::Rng;

use crate::router::{CommandHandler, Descriptor, HandlerContext};

pub const MAX_DICE: i64 = 1024;
pub const MAX_SIDES: i64 = 1024;

/// Above this many dice only the total is shown.
const ITEMIZED_LIMIT: usize = 100;

pub struct RollHandler;

#[async_trait]
impl CommandHandler for RollHandler {
    async fn handle(&self, ctx: HandlerContext) -> anyhow::Result<()> {
        ctx.ack().defer_reply(false).await?;

        let amount = ctx.option_i64("amount").unwrap_or(1);
        let sides = ctx.option_i64("sides").unwrap_or(6);
        if !(1..=MAX_DICE).contains(&amount) || !(1..=MAX_SIDES).contains(&sides) {
            ctx.ack()
                .edit_reply(format!(
                    "<@{}>, both the amount of dice and the number of sides must be between 1 and {MAX_DICE}.",
                    ctx.envelope().requester_id
                ))
                .await?;
            return Ok(());
        }

        let rolls = {
            let mut rng = rand::thread_rng();
            roll_dice(amount as usize, sides as u32, &mut rng)
        };
        ctx.ack()
            .edit_reply(describe_roll(&ctx.envelope().requester_id, sides as u32, &rolls))
            .await?;
        Ok(())
    }
}

pub fn roll_dice<R: Rng + ?Sized>(amount: usize, sides: u32, rng: &mut R) -> Vec<u32> {
    (0..amount).map(|_| rng.gen_range(1..=sides)).collect()
}

pub fn describe_roll(requester_id: &str, sides: u32, rolls: &[u32]) -> String {
    let total: u64 = rolls.iter().map(|&value| u64::from(value)).sum();
    let noun = if rolls.len() == 1 { "die" } else { "dice" };
    let title = format!("**Rolled {}, {sides}-sided {noun}!**", rolls.len());

    let body = match rolls.len() {
        1 => format!("<@{requester_id}>, you rolled a **{total}**"),
        n if n <= ITEMIZED_LIMIT => {
            let itemized: Vec<String> = rolls.iter().map(|value| format!("**{value}**")).collect();
            format!(
                "<@{requester_id}>, you rolled {} = **{total}**",
                itemized.join(" + ")
            )
        }
        _ => format!("<@{requester_id}>, you rolled a combined total of **{total}**"),
    };

    format!("{title}\n{body}")
}

pub fn descriptor() -> Descriptor {
    CommandDescriptor::SlashCommand(SlashCommandDescriptor {
        path: RoutingPath::command("roll"),
        description: "rolls a specified amount of dice with a specified number of sides".to_string(),
        options: vec![
            OptionSchema::new(OptionKind::Integer, "amount", "the amount of dice to roll")
                .range(1.0, MAX_DICE as f64),
            OptionSchema::new(OptionKind::Integer, "sides", "the number of sides on the dice")
                .range(1.0, MAX_SIDES as f64),
        ],
        policy: CommandPolicy::new(ExecutionEnvironment::TenantOnly, AccessLevel::Everyone)
            .with_bot_permissions([Permission::ViewChannel, Permission::SendMessages]),
        category: Category::FunStuff,
        handler: Arc::new(RollHandler),
    })
}
