use sea_orm::entity::prelude::*;

/// `pub_date` is a unix timestamp in milliseconds, set once at creation.
/// `author_id` is fixed at creation as well; only `text`, `group_id` and
/// `image_id` may change afterwards.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "post")]
pub struct Model {
	#[sea_orm(primary_key, auto_increment = true)]
	pub id: i64,
	pub text: String,
	pub pub_date: i64,
	pub author_id: i64,
	pub group_id: Option<i64>,
	pub image_id: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::user::Entity",
		from = "Column::AuthorId",
		to = "super::user::Column::Id",
		on_update = "NoAction",
		on_delete = "Cascade"
	)]
	Author,
	#[sea_orm(
		belongs_to = "super::group::Entity",
		from = "Column::GroupId",
		to = "super::group::Column::Id",
		on_update = "NoAction",
		on_delete = "SetNull"
	)]
	Group,
	#[sea_orm(
		belongs_to = "super::file::Entity",
		from = "Column::ImageId",
		to = "super::file::Column::Id",
		on_update = "NoAction",
		on_delete = "NoAction"
	)]
	Image,
	#[sea_orm(has_many = "super::comment::Entity")]
	Comment,
}

impl Related<super::user::Entity> for Entity {
	fn to() -> RelationDef { Relation::Author.def() }
}

impl Related<super::group::Entity> for Entity {
	fn to() -> RelationDef { Relation::Group.def() }
}

impl Related<super::comment::Entity> for Entity {
	fn to() -> RelationDef { Relation::Comment.def() }
}

impl ActiveModelBehavior for ActiveModel {}
