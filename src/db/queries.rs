use thiserror::Error;

/// 可执行的SQL语句：SQL文本 + 按占位符顺序排列的绑定参数
///
/// 用户输入一律走绑定参数，不拼接进SQL文本。
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Float(f64),
}

impl SqlStatement {
    /// 无参数语句 (run_sql 透传用，语句按原样信任)
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }
}

/// 两个向量列：项目名称向量 与 产品向量
///
/// 检索策略按此处声明顺序评估，项目名称向量在前。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingColumn {
    ProjectName,
    Product,
}

impl EmbeddingColumn {
    pub fn column(&self) -> &'static str {
        match self {
            Self::ProjectName => "项目名称_embedding",
            Self::Product => "产品_embedding",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::ProjectName => "项目名称向量",
            Self::Product => "产品向量",
        }
    }
}

/// 查询向量校验失败
#[derive(Debug, Error, PartialEq)]
pub enum VectorError {
    #[error("查询向量为空")]
    Empty,
    #[error("查询向量第{index}维不是有限数值")]
    NonFinite { index: usize },
}

/// 渲染向量字面量 '[f1,f2,...]'，逗号分隔无空格
///
/// 渲染结果作为绑定参数传给 l2_distance，不拼接进SQL文本。
pub fn render_vector(vector: &[f64]) -> Result<String, VectorError> {
    if vector.is_empty() {
        return Err(VectorError::Empty);
    }
    if let Some(index) = vector.iter().position(|v| !v.is_finite()) {
        return Err(VectorError::NonFinite { index });
    }
    let values: Vec<String> = vector.iter().map(|v| v.to_string()).collect();
    Ok(format!("[{}]", values.join(",")))
}

/// LIKE 模式转义：% _ \ 按字面匹配
fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn like_pattern(term: &str) -> String {
    format!("%{}%", escape_like(term))
}

/// 查询采购项目 (LIKE)
pub fn procurement_search(item_name: &str) -> SqlStatement {
    let pattern = like_pattern(item_name);
    SqlStatement {
        sql: r#"
SELECT
  `项目名称`,
  `单位` AS `采购单位`,
  `细化产品`,
  `供应商名称`,
  `中标金额_万元` AS `中标金额（万元）`,
  `参与状态`
FROM `xunyuan_agent`.`bidding_records_1`
WHERE `项目名称` LIKE ? OR `细化产品` LIKE ?
ORDER BY `项目名称` DESC, `中标金额_万元` DESC
LIMIT 20
        "#
        .trim()
        .to_string(),
        params: vec![SqlParam::Text(pattern.clone()), SqlParam::Text(pattern)],
    }
}

/// 供应商表现聚合外层：投标/中标次数、中标率、合计中标金额，仅统计中标记录
fn supplier_aggregate(inner_sql: &str, params: Vec<SqlParam>) -> SqlStatement {
    let sql = format!(
        r#"
SELECT
    t.`供应商名称`,
    COUNT(*) AS `投标次数`,
    SUM(CASE WHEN t.`参与状态` = '中标' THEN 1 ELSE 0 END) AS `中标次数`,
    ROUND(SUM(CASE WHEN t.`参与状态` = '中标' THEN 1 ELSE 0 END) * 100.0 / COUNT(*), 2) AS `中标率(%)`,
    SUM(CAST(REPLACE(t.`中标金额_万元`, ',', '') AS DECIMAL(15,2))) AS `合计中标金额（万元）`
FROM
    (
{inner_sql}
    ) AS t
WHERE t.`参与状态` = '中标'
GROUP BY
    t.`供应商名称`
ORDER BY
    `中标次数` DESC,
    `合计中标金额（万元）` DESC
LIMIT 10
        "#
    )
    .trim()
    .to_string();
    SqlStatement { sql, params }
}

/// 查询供应商历史表现 (LIKE 变体)
pub fn performance_like(item_name: &str) -> SqlStatement {
    let pattern = like_pattern(item_name);
    supplier_aggregate(
        r#"        SELECT
            `供应商名称`,
            `参与状态`,
            `中标金额_万元`
        FROM
            `xunyuan_agent`.`bidding_records_1`
        WHERE
            `项目名称` LIKE ?
            OR `细化产品` LIKE ?
        LIMIT 50"#,
        vec![SqlParam::Text(pattern.clone()), SqlParam::Text(pattern)],
    )
}

/// 查询供应商历史表现 (向量变体，内层按L2距离取近邻)
pub fn performance_vector(
    column: EmbeddingColumn,
    vector_literal: &str,
    max_distance: Option<f64>,
) -> SqlStatement {
    let col = column.column();
    let mut filter = format!("`{col}` IS NOT NULL");
    let mut params = Vec::new();
    if let Some(distance) = max_distance {
        filter.push_str(&format!(" AND l2_distance(`{col}`, ?) <= ?"));
        params.push(SqlParam::Text(vector_literal.to_string()));
        params.push(SqlParam::Float(distance));
    }
    params.push(SqlParam::Text(vector_literal.to_string()));
    let inner = format!(
        r#"        SELECT
            `供应商名称`,
            `参与状态`,
            `中标金额_万元`
        FROM
            `xunyuan_agent`.`bidding_records_1`
        WHERE
            {filter}
        ORDER BY l2_distance(`{col}`, ?) ASC
        LIMIT 50"#
    );
    supplier_aggregate(&inner, params)
}

/// 查询二采产品价格库 (LIKE 变体)
pub fn price_like(item_name: &str) -> SqlStatement {
    let pattern = like_pattern(item_name);
    SqlStatement {
        sql: r#"
SELECT
  `项目名称`,
  `物料短描述`,
  `物料单位`,
  `平均单价（元）`,
  `最高价（元）`,
  `最低价（元）`
FROM `xunyuan_agent`.`product_price`
WHERE `物料短描述` LIKE ? OR `项目名称` LIKE ?
LIMIT 10
        "#
        .trim()
        .to_string(),
        params: vec![SqlParam::Text(pattern.clone()), SqlParam::Text(pattern)],
    }
}

/// 查询二采产品价格库 (向量变体，带相似度距离列)
pub fn price_vector(
    column: EmbeddingColumn,
    vector_literal: &str,
    max_distance: Option<f64>,
) -> SqlStatement {
    let col = column.column();
    let mut params = vec![SqlParam::Text(vector_literal.to_string())];
    let mut filter = format!("`{col}` IS NOT NULL");
    if let Some(distance) = max_distance {
        filter.push_str(&format!(" AND l2_distance(`{col}`, ?) <= ?"));
        params.push(SqlParam::Text(vector_literal.to_string()));
        params.push(SqlParam::Float(distance));
    }
    let sql = format!(
        r#"
SELECT
  `项目名称`,
  `物料短描述`,
  `物料单位`,
  `平均单价（元）`,
  `最高价（元）`,
  `最低价（元）`,
  l2_distance(`{col}`, ?) AS `相似度距离`
FROM `xunyuan_agent`.`product_price`
WHERE {filter}
ORDER BY `相似度距离` ASC
LIMIT 3
        "#
    )
    .trim()
    .to_string();
    SqlStatement { sql, params }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn procurement_sql_shape() {
        let st = procurement_search("螺母");
        assert!(st.sql.contains("ORDER BY `项目名称` DESC, `中标金额_万元` DESC"));
        assert!(st.sql.contains("LIMIT 20"));
        assert_eq!(
            st.params,
            vec![
                SqlParam::Text("%螺母%".to_string()),
                SqlParam::Text("%螺母%".to_string())
            ]
        );
    }

    #[test]
    fn user_text_never_reaches_sql_text() {
        let item = "绝缘子'; DROP TABLE x; --";
        for st in [
            procurement_search(item),
            performance_like(item),
            price_like(item),
        ] {
            assert!(!st.sql.contains("绝缘子"));
            assert!(!st.sql.contains("DROP"));
        }
        // 参数里原样保留
        let st = procurement_search(item);
        match &st.params[0] {
            SqlParam::Text(p) => assert!(p.contains("绝缘子'; DROP TABLE x; --")),
            other => panic!("unexpected param: {other:?}"),
        }
    }

    #[test]
    fn like_metachars_escaped() {
        assert_eq!(like_pattern("50%_件"), "%50\\%\\_件%");
        assert_eq!(like_pattern(r"a\b"), "%a\\\\b%");
    }

    #[test]
    fn vector_literal_no_padding() {
        assert_eq!(render_vector(&[0.1, 0.2, -1.5]).unwrap(), "[0.1,0.2,-1.5]");
    }

    #[test]
    fn vector_rejects_bad_input() {
        assert_eq!(render_vector(&[]), Err(VectorError::Empty));
        assert_eq!(
            render_vector(&[0.1, f64::NAN]),
            Err(VectorError::NonFinite { index: 1 })
        );
        assert_eq!(
            render_vector(&[f64::INFINITY]),
            Err(VectorError::NonFinite { index: 0 })
        );
    }

    #[test]
    fn performance_like_aggregate_shape() {
        let st = performance_like("螺母");
        assert!(st.sql.contains("LIMIT 50"));
        assert!(st.sql.contains("LIMIT 10"));
        assert!(st.sql.contains("`中标率(%)`"));
        assert!(st.sql.contains("`中标次数` DESC"));
    }

    #[test]
    fn performance_vector_param_order() {
        let literal = render_vector(&[0.1, 0.2]).unwrap();
        let st = performance_vector(EmbeddingColumn::ProjectName, &literal, None);
        assert!(st.sql.contains("ORDER BY l2_distance(`项目名称_embedding`, ?) ASC"));
        assert_eq!(st.params, vec![SqlParam::Text("[0.1,0.2]".to_string())]);

        // 带距离上限时：WHERE 的两个参数在前，ORDER BY 的在后
        let st = performance_vector(EmbeddingColumn::Product, &literal, Some(0.8));
        assert!(st.sql.contains("l2_distance(`产品_embedding`, ?) <= ?"));
        assert_eq!(
            st.params,
            vec![
                SqlParam::Text("[0.1,0.2]".to_string()),
                SqlParam::Float(0.8),
                SqlParam::Text("[0.1,0.2]".to_string()),
            ]
        );
    }

    #[test]
    fn price_vector_shape() {
        let literal = render_vector(&[0.5]).unwrap();
        let st = price_vector(EmbeddingColumn::Product, &literal, None);
        assert!(st.sql.contains("AS `相似度距离`"));
        assert!(st.sql.contains("LIMIT 3"));
        assert_eq!(st.params, vec![SqlParam::Text("[0.5]".to_string())]);
    }

    #[test]
    fn price_like_shape() {
        let st = price_like("电缆");
        assert!(st.sql.contains("`物料短描述` LIKE ? OR `项目名称` LIKE ?"));
        assert!(st.sql.contains("LIMIT 10"));
    }
}
