//! Course listing, details and purchase

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dialoguer::{theme::ColorfulTheme, Confirm};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;

use mentora_client::context::PublishProgress;
use mentora_client::{
    Course, CourseDraft, Difficulty, FileUpload, MentoraContext, ModuleDraft, PendingTransaction,
    PublishStage,
};

use crate::style::*;

pub async fn list(ctx: &MentoraContext, json: bool) -> Result<()> {
    let mentora = ctx.mentora()?;
    let courses = mentora
        .get_all_courses()
        .await
        .context("Failed to load courses")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&courses)?);
        return Ok(());
    }

    print_header("Courses");
    if courses.is_empty() {
        print_info("No courses published yet");
        return Ok(());
    }

    let mut table = table(&[
        "ID", "Title", "Category", "Level", "Price", "Modules", "Enrolled", "Active",
    ]);
    for course in &courses {
        table.add_row(vec![
            course.info.id.to_string(),
            truncate(&course.info.title, 40),
            course.info.category.clone(),
            course.info.difficulty.to_string(),
            format!("{} {}", course.stats.price(), ctx.config().network.currency),
            course.stats.module_count.to_string(),
            course.stats.enrolled_users.to_string(),
            if course.stats.is_active { "yes" } else { "no" }.to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub async fn show(ctx: &MentoraContext, id: u64, json: bool) -> Result<()> {
    let course = ctx
        .mentora()?
        .get_course(id)
        .await
        .with_context(|| format!("Failed to load course {id}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&course)?);
        return Ok(());
    }

    print_course(ctx, &course);
    Ok(())
}

fn print_course(ctx: &MentoraContext, course: &Course) {
    let storage = ctx.storage();
    let network = &ctx.config().network;

    print_header(&course.info.title);
    print_field("ID", course.info.id);
    print_field("Category", &course.info.category);
    print_field("Difficulty", course.info.difficulty);
    print_field("Duration", format!("{} min", course.info.duration));
    print_field(
        "Price",
        format!("{} {}", course.stats.price(), network.currency),
    );
    print_field("Creator", network.address_url(&course.stats.creator));
    print_field("Modules", course.stats.module_count);
    print_field("Sales", course.stats.total_sales);
    print_field("Enrolled", course.stats.enrolled_users);
    print_field("Active", course.stats.is_active);
    if !course.info.thumbnail_ipfs_hash.is_empty() {
        print_field("Thumbnail", storage.ipfs_url(&course.info.thumbnail_ipfs_hash));
    }
    println!();
    for line in course.info.description.lines() {
        println!("  {line}");
    }
    println!();
}

const NO_ACCOUNT_HINT: &str = "No account configured; set MENTORA_PRIVATE_KEY or \
     MENTORA_DEFAULT_ACCOUNT, or private_key / default_account in the config";

pub async fn purchase(ctx: &MentoraContext, id: u64, yes: bool, wait: bool) -> Result<()> {
    let mentora = ctx.mentora()?;
    let network = &ctx.config().network;

    let buyer = mentora
        .default_account()
        .context(NO_ACCOUNT_HINT)?;

    let course = mentora
        .get_course(id)
        .await
        .with_context(|| format!("Failed to load course {id}"))?;
    if !course.stats.is_active {
        anyhow::bail!("Course {id} is not available for purchase");
    }
    if mentora.has_user_purchased_course(buyer, id).await? {
        print_warning(&format!("{buyer} already owns course {id}"));
        return Ok(());
    }

    let price = course.stats.price();
    print_header("Purchase Course");
    print_field("Course", &course.info.title);
    print_field("Price", format!("{} {}", price, network.currency));
    print_field("Buyer", buyer);
    println!();

    if !yes {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Pay {} {} for this course?", price, network.currency))
            .default(false)
            .interact()?;
        if !confirmed {
            print_info("Purchase cancelled");
            return Ok(());
        }
    }

    let pending = mentora
        .purchase_course(id, &price)
        .await
        .context("Purchase transaction failed")?;
    print_success(&format!("Transaction sent: {}", pending.hash()));
    print_info(&network.tx_url(pending.hash()));

    if wait {
        await_receipt(pending, "Purchase was not confirmed").await?;
    }
    Ok(())
}

async fn await_receipt(pending: PendingTransaction, failure: &'static str) -> Result<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("  {spinner:.cyan} {msg}")?);
    spinner.set_message("Waiting for confirmation...");
    spinner.enable_steady_tick(Duration::from_millis(120));

    let outcome = pending.wait().await;
    spinner.finish_and_clear();
    let receipt = outcome.context(failure)?;
    print_success(&format!("Confirmed in block {}", receipt.block_number));
    Ok(())
}

/// Course description file for `publish`; media paths are relative to the file
#[derive(Debug, Deserialize)]
struct CourseFile {
    title: String,
    description: String,
    category: String,
    difficulty: Difficulty,
    /// Minutes
    duration: u64,
    price: String,
    thumbnail: PathBuf,
    intro_video: PathBuf,
    #[serde(default)]
    modules: Vec<ModuleFile>,
}

#[derive(Debug, Deserialize)]
struct ModuleFile {
    title: String,
    video: PathBuf,
    #[serde(default)]
    materials: Vec<PathBuf>,
}

async fn read_media(base: &Path, path: &Path) -> Result<FileUpload> {
    let full = base.join(path);
    FileUpload::from_path(&full)
        .await
        .with_context(|| format!("Failed to read {}", full.display()))
}

async fn load_draft(path: &Path) -> Result<CourseDraft> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file: CourseFile =
        toml::from_str(&raw).with_context(|| format!("Invalid course file {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    let mut modules = Vec::with_capacity(file.modules.len());
    for module in &file.modules {
        let mut materials = Vec::with_capacity(module.materials.len());
        for material in &module.materials {
            materials.push(read_media(base, material).await?);
        }
        modules.push(ModuleDraft {
            title: module.title.clone(),
            video: read_media(base, &module.video).await?,
            materials,
        });
    }

    Ok(CourseDraft {
        title: file.title,
        description: file.description,
        category: file.category,
        difficulty: file.difficulty,
        duration: file.duration,
        price: file.price,
        thumbnail: read_media(base, &file.thumbnail).await?,
        intro_video: read_media(base, &file.intro_video).await?,
        modules,
    })
}

fn stage_label(stage: &PublishStage) -> String {
    match stage {
        PublishStage::Thumbnail => "thumbnail".to_string(),
        PublishStage::IntroVideo => "intro video".to_string(),
        PublishStage::ModuleVideo { module } => format!("module {} video", module + 1),
        PublishStage::Material { module, index } => {
            format!("module {} material {}", module + 1, index + 1)
        }
        PublishStage::Manifest => "manifest".to_string(),
        PublishStage::Transaction => "createCourse".to_string(),
    }
}

pub async fn publish(ctx: &MentoraContext, path: &Path, yes: bool, wait: bool) -> Result<()> {
    let draft = load_draft(path).await?;
    let network = &ctx.config().network;

    let total: u64 = draft.thumbnail.size()
        + draft.intro_video.size()
        + draft
            .modules
            .iter()
            .map(|m| m.video.size() + m.materials.iter().map(FileUpload::size).sum::<u64>())
            .sum::<u64>();

    print_header("Publish Course");
    print_field("Title", &draft.title);
    print_field("Price", format!("{} {}", draft.price, network.currency));
    print_field("Modules", draft.modules.len());
    print_field("Upload size", format!("{total} bytes"));
    println!();

    if !yes {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Upload media and create the course?")
            .default(true)
            .interact()?;
        if !confirmed {
            print_info("Publish cancelled");
            return Ok(());
        }
    }

    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::with_template(
            "  {msg:<24} {bar:30.cyan/blue} {bytes}/{total_bytes}",
        )?
        .progress_chars("█▓░"),
    );
    let progress: PublishProgress = {
        let bar = bar.clone();
        let done = Arc::new(parking_lot::Mutex::new((String::new(), 0u64, 0u64)));
        Arc::new(move |stage: &PublishStage, bytes: u64| {
            let label = stage_label(stage);
            let mut state = done.lock();
            let (current, base, last) = &mut *state;
            if *current != label {
                *base += *last;
                *last = 0;
                *current = label.clone();
                bar.set_message(label);
            }
            *last = bytes;
            bar.set_position(*base + bytes);
        })
    };

    let outcome = ctx.publish_course(&draft, Some(progress)).await;
    bar.finish_and_clear();
    let published = outcome.context("Failed to publish course")?;

    print_success("Course media uploaded");
    print_field("Thumbnail", ctx.storage().ipfs_url(published.thumbnail.as_str()));
    print_field("Content", ctx.storage().ipfs_url(published.content.as_str()));
    print_field("Materials", published.manifest.material_count);
    print_success(&format!("Transaction sent: {}", published.transaction.hash()));
    print_info(&network.tx_url(published.transaction.hash()));

    if wait {
        await_receipt(published.transaction, "Course creation was not confirmed").await?;
    }
    Ok(())
}
