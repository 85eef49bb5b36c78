//! Course marketplace contract client
//!
//! Wraps the Mentora contract: course listings, purchases, refunds and creator
//! payouts. Reads go through `eth_call`; writes return a `PendingTransaction`
//! the caller may await. Failures are passed through untouched except for
//! reverts on lookups, which become `NotFound`.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::chain::abi::{ParamType as P, Token};
use crate::chain::units::parse_ether;
use crate::chain::{Address, Contract, EthTransport, PendingTransaction, TxOptions};
use crate::error::{ClientError, Result};
use crate::models::{Course, CourseInfo, CourseStats, CourseUpdate, Difficulty, NewCourse};

/// Canonical function signatures of the Mentora contract
pub mod signatures {
    pub const OWNER: &str = "owner()";
    pub const PLATFORM_FEE_PERCENT: &str = "platformFeePercent()";
    pub const COURSE_COUNTER: &str = "courseCounter()";
    pub const CREATE_COURSE: &str =
        "createCourse(string,string,string,string,string,uint8,uint256,uint256,uint256)";
    pub const UPDATE_COURSE_CONTENT: &str = "updateCourseContent(uint256,string,uint256)";
    pub const UPDATE_MATERIAL_COUNT: &str = "updateMaterialCount(uint256,uint256)";
    pub const UPDATE_COURSE: &str =
        "updateCourse(uint256,string,string,string,string,uint256,bool,uint256)";
    pub const DELIST_COURSE: &str = "delistCourse(uint256)";
    pub const PURCHASE_COURSE: &str = "purchaseCourse(uint256)";
    pub const REQUEST_REFUND: &str = "requestRefund(uint256)";
    pub const PROCESS_REFUND: &str = "processRefund(uint256,address)";
    pub const CREATOR_WITHDRAW: &str = "creatorWithdraw()";
    pub const OWNER_WITHDRAW: &str = "ownerWithdraw()";
    pub const CHANGE_PLATFORM_FEE: &str = "changePlatformFee(uint256)";
    pub const GET_COURSE_INFO: &str = "getCourseInfo(uint256)";
    pub const GET_COURSE_STATS: &str = "getCourseStats(uint256)";
    pub const GET_COURSE_CONTENT: &str = "getCourseContent(uint256)";
    pub const GET_COURSE_PREVIEW: &str = "getCoursePreview(uint256)";
    pub const GET_USER_COURSE_COUNT: &str = "getUserCourseCount(address)";
    pub const GET_CREATOR_COURSE_COUNT: &str = "getCreatorCourseCount(address)";
    pub const HAS_USER_PURCHASED_COURSE: &str = "hasUserPurchasedCourse(address,uint256)";
}

use signatures as sig;

/// Client for the Mentora course contract
pub struct MentoraClient {
    contract: Contract,
}

impl MentoraClient {
    pub fn new(transport: Arc<dyn EthTransport>, address: Address) -> Self {
        Self::from_contract(Contract::new(transport, address))
    }

    pub fn from_contract(contract: Contract) -> Self {
        Self { contract }
    }

    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    /// Set (or clear) the account used as sender for writes
    pub fn set_default_account(&self, account: Option<Address>) {
        self.contract.set_default_account(account);
    }

    pub fn default_account(&self) -> Option<Address> {
        self.contract.default_account()
    }

    // ==================== Reads ====================

    pub async fn owner(&self) -> Result<Address> {
        self.contract
            .call(sig::OWNER, &[], &[P::Address])
            .await?
            .address()
    }

    /// Platform fee in percent
    pub async fn platform_fee(&self) -> Result<u64> {
        self.contract
            .call(sig::PLATFORM_FEE_PERCENT, &[], &[P::Uint])
            .await?
            .u64()
    }

    /// Number of courses ever created; ids run from 1 to this value
    pub async fn course_count(&self) -> Result<u64> {
        self.contract
            .call(sig::COURSE_COUNTER, &[], &[P::Uint])
            .await?
            .u64()
    }

    pub async fn get_course_info(&self, course_id: u64) -> Result<CourseInfo> {
        let mut out = self
            .contract
            .call(
                sig::GET_COURSE_INFO,
                &[course_id.into()],
                &[P::Uint, P::String, P::String, P::String, P::String, P::Uint, P::Uint],
            )
            .await
            .map_err(|e| e.revert_as_not_found(|| format!("course {course_id}")))?;

        Ok(CourseInfo {
            id: out.u64()?,
            title: out.string()?,
            description: out.string()?,
            category: out.string()?,
            thumbnail_ipfs_hash: out.string()?,
            difficulty: Difficulty::try_from(out.uint()?)?,
            duration: out.u64()?,
        })
    }

    pub async fn get_course_stats(&self, course_id: u64) -> Result<CourseStats> {
        let mut out = self
            .contract
            .call(
                sig::GET_COURSE_STATS,
                &[course_id.into()],
                &[P::Address, P::Bool, P::Uint, P::Uint, P::Uint, P::Uint],
            )
            .await
            .map_err(|e| e.revert_as_not_found(|| format!("course {course_id}")))?;

        Ok(CourseStats {
            creator: out.address()?,
            is_active: out.bool()?,
            price_wei: out.uint()?,
            total_sales: out.u64()?,
            module_count: out.u64()?,
            enrolled_users: out.u64()?,
        })
    }

    /// Info and stats in one record
    pub async fn get_course(&self, course_id: u64) -> Result<Course> {
        let info = self.get_course_info(course_id).await?;
        let stats = self.get_course_stats(course_id).await?;
        Ok(Course::new(info, stats))
    }

    /// Every course from 1 to `course_count()`, one info and one stats call
    /// each. Courses that fail to load are logged and left out; a transport
    /// failure aborts the listing.
    pub async fn get_all_courses(&self) -> Result<Vec<Course>> {
        let count = self.course_count().await?;
        debug!(count, "Loading all courses");

        let mut courses = Vec::new();
        for id in 1..=count {
            match self.get_course(id).await {
                Ok(course) => courses.push(course),
                // node unreachable: every remaining read would fail the same way
                Err(e @ ClientError::Transport(_)) => return Err(e),
                Err(e) => warn!(course_id = id, error = %e, "Error fetching course"),
            }
        }
        Ok(courses)
    }

    /// Content identifier of the full course; reverts for non-buyers
    pub async fn get_course_content(&self, course_id: u64) -> Result<String> {
        self.contract
            .call(sig::GET_COURSE_CONTENT, &[course_id.into()], &[P::String])
            .await?
            .string()
    }

    /// Content identifier of the public preview
    pub async fn get_course_preview(&self, course_id: u64) -> Result<String> {
        self.contract
            .call(sig::GET_COURSE_PREVIEW, &[course_id.into()], &[P::String])
            .await
            .map_err(|e| e.revert_as_not_found(|| format!("course {course_id}")))?
            .string()
    }

    pub async fn get_user_course_count(&self, user: Address) -> Result<u64> {
        self.contract
            .call(sig::GET_USER_COURSE_COUNT, &[user.into()], &[P::Uint])
            .await?
            .u64()
    }

    pub async fn get_creator_course_count(&self, creator: Address) -> Result<u64> {
        self.contract
            .call(sig::GET_CREATOR_COURSE_COUNT, &[creator.into()], &[P::Uint])
            .await?
            .u64()
    }

    pub async fn has_user_purchased_course(&self, user: Address, course_id: u64) -> Result<bool> {
        self.contract
            .call(
                sig::HAS_USER_PURCHASED_COURSE,
                &[user.into(), course_id.into()],
                &[P::Bool],
            )
            .await?
            .bool()
    }

    // ==================== Writes ====================

    pub async fn create_course(&self, course: &NewCourse) -> Result<PendingTransaction> {
        let price_wei = parse_ether(&course.price)?;
        self.contract
            .send(
                sig::CREATE_COURSE,
                &[
                    course.title.as_str().into(),
                    course.description.as_str().into(),
                    course.category.as_str().into(),
                    course.thumbnail_ipfs_hash.as_str().into(),
                    course.content_ipfs_hash.as_str().into(),
                    course.difficulty.as_u8().into(),
                    course.duration.into(),
                    price_wei.into(),
                    course.module_count.into(),
                ],
                TxOptions::default(),
            )
            .await
    }

    pub async fn update_course_content(
        &self,
        course_id: u64,
        content_ipfs_hash: &str,
        module_count: u64,
    ) -> Result<PendingTransaction> {
        self.contract
            .send(
                sig::UPDATE_COURSE_CONTENT,
                &[course_id.into(), content_ipfs_hash.into(), module_count.into()],
                TxOptions::default(),
            )
            .await
    }

    pub async fn update_material_count(
        &self,
        course_id: u64,
        material_count: u64,
    ) -> Result<PendingTransaction> {
        self.contract
            .send(
                sig::UPDATE_MATERIAL_COUNT,
                &[course_id.into(), material_count.into()],
                TxOptions::default(),
            )
            .await
    }

    pub async fn update_course(
        &self,
        course_id: u64,
        update: &CourseUpdate,
    ) -> Result<PendingTransaction> {
        let price_wei = parse_ether(&update.price)?;
        self.contract
            .send(
                sig::UPDATE_COURSE,
                &[
                    course_id.into(),
                    update.title.as_str().into(),
                    update.description.as_str().into(),
                    update.thumbnail_ipfs_hash.as_str().into(),
                    update.content_ipfs_hash.as_str().into(),
                    price_wei.into(),
                    update.is_active.into(),
                    update.module_count.into(),
                ],
                TxOptions::default(),
            )
            .await
    }

    pub async fn delist_course(&self, course_id: u64) -> Result<PendingTransaction> {
        self.contract
            .send(sig::DELIST_COURSE, &[course_id.into()], TxOptions::default())
            .await
    }

    /// Buy a course, attaching `price` (ether) as the call value.
    ///
    /// An underfunded caller is reported by the node (usually during gas
    /// estimation) and nothing is submitted.
    pub async fn purchase_course(&self, course_id: u64, price: &str) -> Result<PendingTransaction> {
        let value = parse_ether(price)?;
        self.contract
            .send(
                sig::PURCHASE_COURSE,
                &[course_id.into()],
                TxOptions::with_value(value),
            )
            .await
    }

    pub async fn request_refund(&self, course_id: u64) -> Result<PendingTransaction> {
        self.contract
            .send(sig::REQUEST_REFUND, &[course_id.into()], TxOptions::default())
            .await
    }

    pub async fn process_refund(&self, course_id: u64, buyer: Address) -> Result<PendingTransaction> {
        self.contract
            .send(
                sig::PROCESS_REFUND,
                &[course_id.into(), buyer.into()],
                TxOptions::default(),
            )
            .await
    }

    pub async fn creator_withdraw(&self) -> Result<PendingTransaction> {
        self.contract
            .send(sig::CREATOR_WITHDRAW, &[], TxOptions::default())
            .await
    }

    pub async fn owner_withdraw(&self) -> Result<PendingTransaction> {
        self.contract
            .send(sig::OWNER_WITHDRAW, &[], TxOptions::default())
            .await
    }

    pub async fn change_platform_fee(&self, fee_percent: u64) -> Result<PendingTransaction> {
        self.contract
            .send(
                sig::CHANGE_PLATFORM_FEE,
                &[Token::from(fee_percent)],
                TxOptions::default(),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::abi;
    use crate::chain::testing::ScriptedTransport;
    use crate::error::REVERT_ERROR_CODE;
    use serde_json::{json, Value};

    fn address(last: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = last;
        Address::from_bytes(bytes)
    }

    fn hex_result(tokens: &[Token]) -> Value {
        json!(format!("0x{}", hex::encode(abi::encode(tokens))))
    }

    fn call_data(params: &Value) -> Vec<u8> {
        hex::decode(params[0]["data"].as_str().unwrap().trim_start_matches("0x")).unwrap()
    }

    fn course_id_of(params: &Value) -> u128 {
        let data = call_data(params);
        let mut out = abi::Outputs::new(abi::decode(&[abi::ParamType::Uint], &data[4..]).unwrap());
        out.uint().unwrap()
    }

    fn info_tokens(id: u64) -> Vec<Token> {
        vec![
            Token::Uint(id as u128),
            Token::String(format!("Course {id}")),
            Token::String("Learn things".into()),
            Token::String("blockchain".into()),
            Token::String("QmThumb".into()),
            Token::Uint(2),
            Token::Uint(90),
        ]
    }

    fn stats_tokens(sales: u128) -> Vec<Token> {
        vec![
            Token::Address(address(9)),
            Token::Bool(true),
            Token::Uint(50_000_000_000_000_000),
            Token::Uint(sales),
            Token::Uint(4),
            Token::Uint(sales),
        ]
    }

    fn revert() -> ClientError {
        ClientError::Rpc {
            code: REVERT_ERROR_CODE,
            message: "execution reverted".into(),
            data: Some(format!(
                "0x{}",
                hex::encode(abi::encode_revert_reason("Course does not exist"))
            )),
        }
    }

    /// Node double answering course reads for ids 1..=count, reverting on `missing`
    fn course_node(count: u64, missing: Option<u128>) -> Arc<ScriptedTransport> {
        let info_sel = abi::selector(sig::GET_COURSE_INFO);
        let stats_sel = abi::selector(sig::GET_COURSE_STATS);
        let counter_sel = abi::selector(sig::COURSE_COUNTER);
        Arc::new(ScriptedTransport::new(move |method, params| {
            assert_eq!(method, "eth_call");
            let data = call_data(params);
            let sel = &data[..4];
            if sel == counter_sel {
                return Ok(hex_result(&[Token::Uint(count as u128)]));
            }
            let id = course_id_of(params);
            if Some(id) == missing || id == 0 || id > count as u128 {
                return Err(revert());
            }
            if sel == info_sel {
                Ok(hex_result(&info_tokens(id as u64)))
            } else if sel == stats_sel {
                Ok(hex_result(&stats_tokens(id * 10)))
            } else {
                panic!("unexpected selector {}", hex::encode(sel))
            }
        }))
    }

    #[tokio::test]
    async fn get_course_info_decodes_record() {
        let client = MentoraClient::new(course_node(3, None), address(1));
        let info = client.get_course_info(2).await.unwrap();
        assert_eq!(info.id, 2);
        assert_eq!(info.title, "Course 2");
        assert_eq!(info.thumbnail_ipfs_hash, "QmThumb");
        assert_eq!(info.difficulty, Difficulty::Intermediate);
        assert_eq!(info.duration, 90);
    }

    #[tokio::test]
    async fn missing_course_is_not_found() {
        let client = MentoraClient::new(course_node(3, None), address(1));
        let err = client.get_course_info(42).await.unwrap_err();
        match err {
            ClientError::NotFound(msg) => {
                assert!(msg.contains("course 42"));
                assert!(msg.contains("Course does not exist"));
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
        assert!(matches!(
            client.get_course_stats(42).await,
            Err(ClientError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn get_course_stats_formats_price() {
        let client = MentoraClient::new(course_node(3, None), address(1));
        let stats = client.get_course_stats(1).await.unwrap();
        assert_eq!(stats.creator, address(9));
        assert_eq!(stats.price(), "0.05");
        assert_eq!(stats.total_sales, 10);
        assert_eq!(stats.module_count, 4);
    }

    #[tokio::test]
    async fn get_all_courses_walks_ids_from_one_and_skips_failures() {
        let transport = course_node(3, Some(2));
        let client = MentoraClient::new(transport.clone(), address(1));

        let courses = client.get_all_courses().await.unwrap();
        let ids: Vec<u64> = courses.iter().map(|c| c.info.id).collect();
        assert_eq!(ids, vec![1, 3]);

        // counter + (info [+ stats]) per id; id 2 fails on info
        assert_eq!(transport.call_count(), 1 + 2 + 1 + 2);
    }

    #[tokio::test]
    async fn get_all_courses_stops_when_node_is_unreachable() {
        let counter_sel = abi::selector(sig::COURSE_COUNTER);
        let transport = Arc::new(ScriptedTransport::new(move |_, params| {
            if call_data(params)[..4] == counter_sel {
                return Ok(hex_result(&[Token::Uint(u64::MAX as u128)]));
            }
            Err(ClientError::Transport("connection reset".into()))
        }));
        let client = MentoraClient::new(transport.clone(), address(1));

        let err = client.get_all_courses().await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn get_all_courses_with_zero_count_is_empty() {
        let transport = course_node(0, None);
        let client = MentoraClient::new(transport.clone(), address(1));
        assert!(client.get_all_courses().await.unwrap().is_empty());
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn create_course_requires_caller() {
        let transport = Arc::new(ScriptedTransport::new(|_, _| Ok(json!("0x1"))));
        let client = MentoraClient::new(transport.clone(), address(1));
        let course = NewCourse {
            title: "Rust".into(),
            description: "d".into(),
            category: "dev".into(),
            thumbnail_ipfs_hash: "QmT".into(),
            content_ipfs_hash: "QmC".into(),
            difficulty: Difficulty::Beginner,
            duration: 60,
            price: "0.1".into(),
            module_count: 2,
        };

        let err = client.create_course(&course).await.unwrap_err();
        assert!(matches!(err, ClientError::Configuration(_)));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn create_course_encodes_price_in_wei() {
        let transport = Arc::new(ScriptedTransport::new(|method, _| match method {
            "eth_estimateGas" => Ok(json!("0x30000")),
            "eth_gasPrice" => Ok(json!("0x1")),
            "eth_sendTransaction" => Ok(json!("0xc0ffee")),
            other => panic!("unexpected {other}"),
        }));
        let client = MentoraClient::new(transport.clone(), address(1));
        client.set_default_account(Some(address(7)));

        let course = NewCourse {
            title: "Rust".into(),
            description: "Systems".into(),
            category: "dev".into(),
            thumbnail_ipfs_hash: "QmT".into(),
            content_ipfs_hash: "QmC".into(),
            difficulty: Difficulty::Advanced,
            duration: 120,
            price: "0.1".into(),
            module_count: 5,
        };
        let pending = client.create_course(&course).await.unwrap();
        assert_eq!(pending.hash(), "0xc0ffee");

        let params = transport.params_of("eth_sendTransaction").unwrap();
        let data = call_data(&params);
        assert_eq!(&data[..4], &abi::selector(sig::CREATE_COURSE));
        let mut out = abi::Outputs::new(
            abi::decode(
                &[
                    abi::ParamType::String,
                    abi::ParamType::String,
                    abi::ParamType::String,
                    abi::ParamType::String,
                    abi::ParamType::String,
                    abi::ParamType::Uint,
                    abi::ParamType::Uint,
                    abi::ParamType::Uint,
                    abi::ParamType::Uint,
                ],
                &data[4..],
            )
            .unwrap(),
        );
        assert_eq!(out.string().unwrap(), "Rust");
        for _ in 0..4 {
            out.string().unwrap();
        }
        assert_eq!(out.uint().unwrap(), 3);
        assert_eq!(out.uint().unwrap(), 120);
        assert_eq!(out.uint().unwrap(), 100_000_000_000_000_000);
        assert_eq!(out.uint().unwrap(), 5);
    }

    #[tokio::test]
    async fn create_course_rejects_bad_price_before_network() {
        let transport = Arc::new(ScriptedTransport::new(|_, _| Ok(json!("0x1"))));
        let client = MentoraClient::new(transport.clone(), address(1));
        client.set_default_account(Some(address(7)));
        let course = NewCourse {
            title: "Rust".into(),
            description: "d".into(),
            category: "dev".into(),
            thumbnail_ipfs_hash: String::new(),
            content_ipfs_hash: String::new(),
            difficulty: Difficulty::Beginner,
            duration: 1,
            price: "free".into(),
            module_count: 0,
        };
        assert!(matches!(
            client.create_course(&course).await,
            Err(ClientError::Validation(_))
        ));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn purchase_attaches_value() {
        let transport = Arc::new(ScriptedTransport::new(|method, _| match method {
            "eth_estimateGas" => Ok(json!("0x5208")),
            "eth_gasPrice" => Ok(json!("0x1")),
            "eth_sendTransaction" => Ok(json!("0x1234")),
            other => panic!("unexpected {other}"),
        }));
        let client = MentoraClient::new(transport.clone(), address(1));
        client.set_default_account(Some(address(7)));

        client.purchase_course(7, "0.05").await.unwrap();

        let estimate = transport.params_of("eth_estimateGas").unwrap();
        assert_eq!(estimate[0]["value"], "0xb1a2bc2ec50000");
        let sent = transport.params_of("eth_sendTransaction").unwrap();
        assert_eq!(sent[0]["value"], "0xb1a2bc2ec50000");
        assert_eq!(course_id_of(&sent), 7);
    }

    #[tokio::test]
    async fn underfunded_purchase_rejects_and_leaves_sales_unchanged() {
        let stats_sel = abi::selector(sig::GET_COURSE_STATS);
        let transport = Arc::new(ScriptedTransport::new(move |method, params| match method {
            "eth_call" if call_data(params)[..4] == stats_sel => Ok(hex_result(&stats_tokens(3))),
            "eth_estimateGas" => Err(ClientError::Rpc {
                code: -32000,
                message: "insufficient funds for gas * price + value".into(),
                data: None,
            }),
            other => panic!("unexpected {other}"),
        }));
        let client = MentoraClient::new(transport.clone(), address(1));
        client.set_default_account(Some(address(7)));

        let before = client.get_course_stats(7).await.unwrap().total_sales;
        let err = client.purchase_course(7, "0.05").await.unwrap_err();
        let after = client.get_course_stats(7).await.unwrap().total_sales;

        assert!(matches!(err, ClientError::Rpc { ref message, .. } if message.contains("insufficient funds")));
        assert_eq!(transport.count_of("eth_sendTransaction"), 0);
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn has_user_purchased_course_reads_bool() {
        let transport = Arc::new(ScriptedTransport::new(|_, _| {
            Ok(hex_result(&[Token::Bool(true)]))
        }));
        let client = MentoraClient::new(transport.clone(), address(1));
        assert!(client
            .has_user_purchased_course(address(5), 3)
            .await
            .unwrap());

        let data = call_data(&transport.params_of("eth_call").unwrap());
        assert_eq!(&data[..4], &abi::selector(sig::HAS_USER_PURCHASED_COURSE));
    }
}
